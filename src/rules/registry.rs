//! Rule specifications and the registry that orders them.
//!
//! A [`RuleSpec`] names a rule (a built-in [`RuleKind`] or a custom factory
//! function), an execution order, an enable flag, and a [`Settings`] map.
//! [`RuleRegistry::build_sequence`] resolves the specs into a fixed ordered
//! list of rule instances before any phase runs.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    Availability, BuildContext, ConsecutiveDays, Coverage, DecisionVariables, Fairness,
    MinShiftLength, Rest, Rule, Settings, ShiftInterval, WeeklyCap,
};
use crate::error::Result;

/// The built-in rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// Base decision variables.
    Variables,
    /// Mask and holiday guard on worked hours.
    Availability,
    /// Interval → hourly decomposition.
    ShiftInterval,
    /// Minimum realised shift length.
    MinShiftLength,
    /// Rest between consecutive shifts.
    Rest,
    /// Skill minima and maxima.
    Coverage,
    /// Cap on total hours per employee.
    WeeklyCap,
    /// Consecutive-day run tracking and penalty.
    ConsecutiveDays,
    /// Deviation from equal hours, with band shortfall.
    Fairness,
}

impl RuleKind {
    /// All built-in kinds in default order.
    pub const ALL: [RuleKind; 9] = [
        RuleKind::Variables,
        RuleKind::Availability,
        RuleKind::ShiftInterval,
        RuleKind::MinShiftLength,
        RuleKind::Rest,
        RuleKind::Coverage,
        RuleKind::WeeklyCap,
        RuleKind::ConsecutiveDays,
        RuleKind::Fairness,
    ];

    /// Rule name.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Variables => "Variables",
            RuleKind::Availability => "Availability",
            RuleKind::ShiftInterval => "ShiftInterval",
            RuleKind::MinShiftLength => "MinShiftLength",
            RuleKind::Rest => "Rest",
            RuleKind::Coverage => "Coverage",
            RuleKind::WeeklyCap => "WeeklyCap",
            RuleKind::ConsecutiveDays => "ConsecutiveDays",
            RuleKind::Fairness => "Fairness",
        }
    }

    /// Default execution order.
    pub fn default_order(&self) -> i32 {
        match self {
            RuleKind::Variables => 0,
            RuleKind::Availability => 10,
            RuleKind::ShiftInterval => 20,
            RuleKind::MinShiftLength => 40,
            RuleKind::Rest => 50,
            RuleKind::Coverage => 60,
            RuleKind::WeeklyCap => 70,
            RuleKind::ConsecutiveDays => 80,
            RuleKind::Fairness => 90,
        }
    }

    /// Default settings.
    pub fn default_settings(&self) -> Settings {
        match self {
            RuleKind::ConsecutiveDays => Settings::new()
                .with("penalty_free_days", 5)
                .with("base", 2.0)
                .with("scale", 1.0)
                .with("max_gap", 8),
            RuleKind::Fairness => Settings::new()
                .with("base", 1.4)
                .with("scale", 1.0)
                .with("max_deviation_hours", 7)
                .with("band_shortfall_base", 1.25)
                .with("band_shortfall_scale", 2.5)
                .with("band_shortfall_max_gap", 4)
                .with("band_shortfall_threshold", 2),
            _ => Settings::new(),
        }
    }

    /// Constructs the rule. `None` when the rule opts out for this problem.
    pub fn instantiate(&self, settings: &Settings, ctx: &BuildContext) -> Result<Option<Box<dyn Rule>>> {
        fn boxed<R: Rule + 'static>(rule: R) -> Option<Box<dyn Rule>> {
            Some(Box::new(rule))
        }
        Ok(match self {
            RuleKind::Variables => boxed(DecisionVariables::new()),
            RuleKind::Availability => boxed(Availability::new()),
            RuleKind::ShiftInterval => boxed(ShiftInterval::new()),
            RuleKind::MinShiftLength => boxed(MinShiftLength::new()),
            RuleKind::Rest => Rest::from_config(&ctx.cfg).and_then(boxed),
            RuleKind::Coverage => boxed(Coverage::new()),
            RuleKind::WeeklyCap => WeeklyCap::from_config(&ctx.cfg).and_then(boxed),
            RuleKind::ConsecutiveDays => boxed(ConsecutiveDays::from_settings(settings, ctx)?),
            RuleKind::Fairness => boxed(Fairness::from_settings(settings, ctx)?),
        })
    }
}

/// Signature of a custom rule factory.
pub type RuleFactoryFn =
    Arc<dyn Fn(&Settings, &BuildContext) -> Result<Option<Box<dyn Rule>>> + Send + Sync>;

/// How a spec produces its rule.
#[derive(Clone)]
pub enum RuleFactory {
    /// A built-in rule.
    Builtin(RuleKind),
    /// A caller-supplied rule.
    Custom {
        /// Name used for logging.
        name: String,
        /// Constructor.
        build: RuleFactoryFn,
    },
}

impl fmt::Debug for RuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFactory::Builtin(kind) => f.debug_tuple("Builtin").field(kind).finish(),
            RuleFactory::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

/// One entry of the rule pipeline.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    /// Rule constructor.
    pub factory: RuleFactory,
    /// Execution order; `None` uses the built-in default (or 100 for custom rules).
    pub order: Option<i32>,
    /// Disabled specs are skipped.
    pub enabled: bool,
    /// Rule settings, layered over the rule's defaults.
    pub settings: Settings,
}

impl RuleSpec {
    /// Spec for a built-in rule with its default settings.
    pub fn builtin(kind: RuleKind) -> Self {
        Self {
            factory: RuleFactory::Builtin(kind),
            order: None,
            enabled: true,
            settings: kind.default_settings(),
        }
    }

    /// Spec for a custom rule.
    pub fn custom<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&Settings, &BuildContext) -> Result<Option<Box<dyn Rule>>> + Send + Sync + 'static,
    {
        Self {
            factory: RuleFactory::Custom {
                name: name.into(),
                build: Arc::new(build),
            },
            order: None,
            enabled: true,
            settings: Settings::new(),
        }
    }

    /// Sets the execution order.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Overlays settings on the current ones.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.settings = self.settings.merged(settings);
        self
    }

    /// Sets one setting.
    pub fn with_setting(mut self, key: &str, value: impl Into<super::SettingValue>) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Marks the spec disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Order used for sorting.
    pub fn effective_order(&self) -> i32 {
        self.order.unwrap_or(match &self.factory {
            RuleFactory::Builtin(kind) => kind.default_order(),
            RuleFactory::Custom { .. } => 100,
        })
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        match &self.factory {
            RuleFactory::Builtin(kind) => kind.name(),
            RuleFactory::Custom { name, .. } => name,
        }
    }

    /// Constructs the rule bound to `ctx`.
    pub fn instantiate(&self, ctx: &BuildContext) -> Result<Option<Box<dyn Rule>>> {
        match &self.factory {
            RuleFactory::Builtin(kind) => kind.instantiate(&self.settings, ctx),
            RuleFactory::Custom { build, .. } => build(&self.settings, ctx),
        }
    }
}

/// Fresh copies of the built-in specs in default order.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    RuleKind::ALL.iter().map(|kind| RuleSpec::builtin(*kind)).collect()
}

/// An ordered collection of rule specs.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    specs: Vec<RuleSpec>,
}

impl RuleRegistry {
    /// Registry over the given specs.
    pub fn new(specs: Vec<RuleSpec>) -> Self {
        Self { specs }
    }

    /// Empty registry.
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Adds a spec.
    pub fn with_spec(mut self, spec: RuleSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Registered specs in insertion order.
    pub fn specs(&self) -> &[RuleSpec] {
        &self.specs
    }

    /// Enabled specs sorted by order. Ties keep insertion order.
    pub fn ordered(&self) -> Vec<&RuleSpec> {
        let mut enabled: Vec<&RuleSpec> = self.specs.iter().filter(|s| s.enabled).collect();
        enabled.sort_by_key(|s| s.effective_order());
        enabled
    }

    /// Instantiates every enabled rule in order. Rules that opt out are
    /// dropped; settings errors abort.
    pub fn build_sequence(&self, ctx: &BuildContext) -> Result<Vec<Box<dyn Rule>>> {
        let mut rules = Vec::new();
        for spec in self.ordered() {
            match spec.instantiate(ctx)? {
                Some(rule) => {
                    debug!(rule = spec.name(), order = spec.effective_order(), "rule enabled");
                    rules.push(rule);
                }
                None => debug!(rule = spec.name(), "rule opted out"),
            }
        }
        Ok(rules)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new(default_rule_specs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::RosterError;
    use crate::models::{InputData, Staff};

    fn ctx(cfg: Config) -> BuildContext {
        let data = InputData::unrestricted(vec![Staff::new(0, "A"), Staff::new(1, "B")], cfg.hours);
        BuildContext::new(cfg, data)
    }

    fn small_cfg() -> Config {
        Config::new(2, 4).with_shift_bounds(1, 4)
    }

    #[derive(Debug)]
    struct Marker;

    impl Rule for Marker {
        fn name(&self) -> &'static str {
            "Marker"
        }
    }

    #[test]
    fn test_default_specs_are_ordered_and_fresh() {
        let specs = default_rule_specs();
        let orders: Vec<i32> = specs.iter().map(|s| s.effective_order()).collect();
        assert_eq!(orders, vec![0, 10, 20, 40, 50, 60, 70, 80, 90]);

        let mut changed = default_rule_specs();
        changed[7].settings.insert("base", 9.0);
        assert_eq!(
            default_rule_specs()[7].settings.float("c", "base", 0.0).unwrap(),
            2.0
        );
    }

    #[test]
    fn test_sequence_skips_disabled_and_opted_out() {
        let cfg = small_cfg().with_rest_hours(0).with_weekly_max_hours(None);
        let c = ctx(cfg);
        let registry = RuleRegistry::new(
            default_rule_specs()
                .into_iter()
                .map(|s| if s.name() == "Fairness" { s.disabled() } else { s })
                .collect(),
        );
        let names: Vec<&str> = registry
            .build_sequence(&c)
            .unwrap()
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "Variables",
                "Availability",
                "ShiftInterval",
                "MinShiftLength",
                "Coverage",
                "ConsecutiveDays"
            ]
        );
    }

    #[test]
    fn test_stable_sort_with_custom_rule() {
        let c = ctx(small_cfg());
        let registry = RuleRegistry::empty()
            .with_spec(RuleSpec::custom("Marker", |_, _| Ok(Some(Box::new(Marker) as Box<dyn Rule>))).with_order(10))
            .with_spec(RuleSpec::builtin(RuleKind::Availability))
            .with_spec(RuleSpec::builtin(RuleKind::Variables));
        let names: Vec<&str> = registry
            .build_sequence(&c)
            .unwrap()
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["Variables", "Marker", "Availability"]);
    }

    #[test]
    fn test_bad_settings_rejected_at_construction() {
        let c = ctx(small_cfg());
        let spec = RuleSpec::builtin(RuleKind::ConsecutiveDays).with_setting("base", 1.0);
        let err = spec.instantiate(&c).unwrap_err();
        assert!(matches!(err, RosterError::InvalidSetting { ref key, .. } if key == "base"));

        let spec = RuleSpec::builtin(RuleKind::Fairness).with_setting("scale", -1.0);
        assert!(spec.instantiate(&c).is_err());
    }

    #[test]
    fn test_factory_debug_hides_closure() {
        let spec = RuleSpec::custom("Mine", |_, _| Ok(None));
        assert!(format!("{:?}", spec.factory).contains("Mine"));
        assert_eq!(spec.effective_order(), 100);
    }
}
