//! Build context: the shared variable store and live model.
//!
//! One [`BuildContext`] is created per build. Rules read any variable an
//! earlier rule declared and write only their own. Variable families are
//! kept in [`VarMap`]s so that a read of an undeclared key is an error
//! rather than a panic.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;

use crate::config::Config;
use crate::cp::{BoolVar, CpModel, IntVar, LinearExpr, Literal, ModelStats};
use crate::error::{Result, RosterError};
use crate::models::InputData;

/// A keyed family of model variables.
#[derive(Debug, Clone)]
pub struct VarMap<K, V> {
    family: &'static str,
    entries: BTreeMap<K, V>,
}

impl<K: Ord + Debug, V: Copy> VarMap<K, V> {
    /// Creates an empty family named `family` (used in error messages).
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            entries: BTreeMap::new(),
        }
    }

    /// Registers a variable.
    pub fn insert(&mut self, key: K, var: V) {
        self.entries.insert(key, var);
    }

    /// Looks up a variable; a missing key is [`RosterError::MissingVariable`].
    pub fn get(&self, key: &K) -> Result<V> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| RosterError::MissingVariable {
                family: self.family,
                key: format!("{key:?}"),
            })
    }

    /// Looks up a variable, returning `None` when absent.
    pub fn try_get(&self, key: &K) -> Option<V> {
        self.entries.get(key).copied()
    }

    /// Whether `key` is declared.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the family is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

/// Key of an `(employee, day)` variable.
pub type DayKey = (usize, usize);
/// Key of an `(employee, day, hour)` variable.
pub type HourKey = (usize, usize, usize);
/// Key of an `(employee, day, hour, skill)` coverage variable.
pub type CoverKey = (usize, usize, usize, String);

/// The decision variables of a roster model.
#[derive(Debug, Clone)]
pub struct RosterVars {
    /// `y[e,d]`: a shift exists.
    pub shift: VarMap<DayKey, BoolVar>,
    /// `S[e,d]`: shift start hour.
    pub start: VarMap<DayKey, IntVar>,
    /// `L[e,d]`: declared shift length.
    pub length: VarMap<DayKey, IntVar>,
    /// `x[e,d,h]`: hour worked (derived from intervals).
    pub worked: VarMap<HourKey, BoolVar>,
    /// `z[e,d]`: any hour worked that day.
    pub day_worked: VarMap<DayKey, BoolVar>,
    /// `runlen[e,d]`: consecutive worked days ending at `d`.
    pub run_length: VarMap<DayKey, IntVar>,
    /// `a[e,d,h,s]`: employee covers skill `s` at that hour.
    pub cover: VarMap<CoverKey, BoolVar>,
    /// Legal hour indicators covered by the interval that starts on day `d`.
    pub current_hours: BTreeMap<DayKey, Vec<BoolVar>>,
    /// Legal hour indicators of day `d + 1` covered by day `d`'s interval
    /// spilling past midnight, keyed by the originating day `d`.
    pub spill_hours: BTreeMap<DayKey, Vec<BoolVar>>,
}

impl Default for RosterVars {
    fn default() -> Self {
        Self {
            shift: VarMap::new("y"),
            start: VarMap::new("S"),
            length: VarMap::new("L"),
            worked: VarMap::new("x"),
            day_worked: VarMap::new("z"),
            run_length: VarMap::new("runlen"),
            cover: VarMap::new("a"),
            current_hours: BTreeMap::new(),
            spill_hours: BTreeMap::new(),
        }
    }
}

/// Shared state of one model build.
#[derive(Debug)]
pub struct BuildContext {
    /// Problem configuration.
    pub cfg: Config,
    /// Staff and allowed masks.
    pub data: InputData,
    /// The model under construction.
    pub model: CpModel,
    /// Declared decision variables.
    pub vars: RosterVars,
    holidays: Vec<BTreeSet<usize>>,
    labels: HashMap<Literal, String>,
    total_hours: BTreeMap<usize, IntVar>,
}

impl BuildContext {
    /// Creates a context. Holiday dates are converted to day indices once.
    pub fn new(cfg: Config, data: InputData) -> Self {
        let holidays = data.staff.iter().map(|s| s.holiday_days(&cfg)).collect();
        Self {
            cfg,
            data,
            model: CpModel::new("roster"),
            vars: RosterVars::default(),
            holidays,
            labels: HashMap::new(),
            total_hours: BTreeMap::new(),
        }
    }

    /// Number of employees.
    pub fn num_staff(&self) -> usize {
        self.data.staff.len()
    }

    /// `(employees, days, hours)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.num_staff(), self.cfg.days, self.cfg.hours)
    }

    /// Whether day `d` is a holiday for employee `e`.
    pub fn is_holiday(&self, e: usize, d: usize) -> bool {
        self.holidays.get(e).is_some_and(|days| days.contains(&d))
    }

    /// Whether employee `e` may work hour `h` of day `d`: allowed by the
    /// mask and not a holiday.
    pub fn is_legal(&self, e: usize, d: usize, h: usize) -> bool {
        self.data.is_allowed(e, h) && !self.is_holiday(e, d)
    }

    // ===== Diagnosis =====

    /// Creates a fresh literal registered as a solver assumption and
    /// remembers its label.
    pub fn add_assumption(&mut self, label: impl Into<String>) -> Literal {
        let label = label.into();
        let var = self.model.new_bool_var(format!("assume[{label}]"));
        let lit = var.literal();
        self.model.add_assumption(lit);
        self.labels.insert(lit, label);
        lit
    }

    /// An assumption literal for a hard constraint when diagnosis is
    /// enabled, otherwise `None`. The label is only formatted when used.
    pub fn guard(&mut self, label: impl FnOnce() -> String) -> Option<Literal> {
        if self.cfg.enable_unsat_core {
            Some(self.add_assumption(label()))
        } else {
            None
        }
    }

    /// Label of an assumption literal, or `lit#<index>` when unknown.
    pub fn label_of(&self, lit: Literal) -> String {
        self.labels
            .get(&lit)
            .cloned()
            .unwrap_or_else(|| format!("lit#{}", lit.index()))
    }

    /// Labels of a set of assumption literals.
    pub fn core_labels(&self, literals: &[Literal]) -> Vec<String> {
        literals.iter().map(|lit| self.label_of(*lit)).collect()
    }

    // ===== Shared derived variables =====

    /// `T_e = Σ_{d,h} x[e,d,h]`, materialised once and shared between rules.
    pub fn total_hours(&mut self, e: usize) -> Result<IntVar> {
        if let Some(var) = self.total_hours.get(&e) {
            return Ok(*var);
        }
        let (_, days, hours) = self.dims();
        let mut sum = LinearExpr::new();
        for d in 0..days {
            for h in 0..hours {
                sum.add_term(self.vars.worked.get(&(e, d, h))?, 1);
            }
        }
        let total = self
            .model
            .new_int_var(0, (days * hours) as i64, format!("total_hours_e{e}"));
        self.model.add_eq(total, sum);
        self.total_hours.insert(e, total);
        Ok(total)
    }

    /// Model size summary.
    pub fn model_stats(&self) -> ModelStats {
        self.model.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Staff;
    use chrono::NaiveDate;

    fn ctx(unsat_core: bool) -> BuildContext {
        let cfg = Config::new(2, 4).with_unsat_core(unsat_core);
        let staff = vec![
            Staff::new(0, "A").with_holiday(NaiveDate::from_ymd_opt(2025, 10, 14).unwrap()),
            Staff::new(1, "B"),
        ];
        let data = InputData::unrestricted(staff, 4);
        BuildContext::new(cfg, data)
    }

    #[test]
    fn test_var_map_missing_key() {
        let map: VarMap<DayKey, BoolVar> = VarMap::new("y");
        let err = map.get(&(0, 3)).unwrap_err();
        assert_eq!(
            err,
            RosterError::MissingVariable {
                family: "y",
                key: "(0, 3)".into()
            }
        );
    }

    #[test]
    fn test_holidays_and_legality() {
        let c = ctx(true);
        assert!(c.is_holiday(0, 1));
        assert!(!c.is_holiday(0, 0));
        assert!(!c.is_holiday(1, 1));
        assert!(!c.is_legal(0, 1, 2));
        assert!(c.is_legal(1, 1, 2));
    }

    #[test]
    fn test_guard_respects_toggle() {
        let mut on = ctx(true);
        let lit = on.guard(|| "REST[e=0,d=0]".to_string()).unwrap();
        assert_eq!(on.label_of(lit), "REST[e=0,d=0]");
        assert_eq!(on.model.assumptions(), &[lit]);

        let mut off = ctx(false);
        assert!(off.guard(|| unreachable!()).is_none());
        assert!(off.model.assumptions().is_empty());
    }

    #[test]
    fn test_unknown_label_falls_back_to_index() {
        let mut c = ctx(true);
        let var = c.model.new_bool_var("free");
        assert_eq!(c.label_of(var.literal()), format!("lit#{}", var.literal().index()));
    }

    #[test]
    fn test_total_hours_cached() {
        let mut c = ctx(false);
        for e in 0..2 {
            for d in 0..2 {
                for h in 0..4 {
                    let x = c.model.new_bool_var(format!("x{e}{d}{h}"));
                    c.vars.worked.insert((e, d, h), x);
                }
            }
        }
        let before = c.model.num_vars();
        let t0 = c.total_hours(0).unwrap();
        let again = c.total_hours(0).unwrap();
        assert_eq!(t0, again);
        assert_eq!(c.model.num_vars(), before + 1);
        assert_eq!(c.model.domain(t0).unwrap().ub, 8);
    }

    #[test]
    fn test_total_hours_requires_worked_vars() {
        let mut c = ctx(false);
        assert!(matches!(
            c.total_hours(0),
            Err(RosterError::MissingVariable { family: "x", .. })
        ));
    }
}
