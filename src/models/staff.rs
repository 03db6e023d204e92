//! Staff model.
//!
//! A staff member has a band (seniority tier), a set of skill labels, a
//! night-worker flag, an optional cap on consecutive working days, hard
//! holidays and soft preferred-off dates.
//!
//! Skills are one canonical representation: an ordered set of labels. The
//! implicit [`ANY_SKILL`] label is always held.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ANY_SKILL};

/// A staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Identifier, unique within an input.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Seniority tier (≥ 1).
    pub band: u32,
    /// Skill labels. Always contains [`ANY_SKILL`] when built through
    /// [`Staff::new`].
    pub skills: BTreeSet<String>,
    /// Works the night window rather than the day window.
    pub is_night_worker: bool,
    /// Hard cap on consecutive working days.
    pub max_consec_days: Option<u32>,
    /// Dates the employee must not work.
    pub holidays: BTreeSet<NaiveDate>,
    /// Dates the employee would rather not work. Never overlaps `holidays`.
    pub preferred_off: BTreeSet<NaiveDate>,
}

impl Staff {
    /// Creates a band-1 day worker holding only [`ANY_SKILL`].
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        let mut skills = BTreeSet::new();
        skills.insert(ANY_SKILL.to_string());
        Self {
            id,
            name: name.into(),
            band: 1,
            skills,
            is_night_worker: false,
            max_consec_days: None,
            holidays: BTreeSet::new(),
            preferred_off: BTreeSet::new(),
        }
    }

    /// Sets the band.
    pub fn with_band(mut self, band: u32) -> Self {
        self.band = band;
        self
    }

    /// Adds a skill label.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    /// Adds several skill labels.
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills.extend(skills.into_iter().map(Into::into));
        self
    }

    /// Marks the employee as a night worker.
    pub fn night_worker(mut self) -> Self {
        self.is_night_worker = true;
        self
    }

    /// Caps consecutive working days.
    pub fn with_max_consec_days(mut self, days: u32) -> Self {
        self.max_consec_days = Some(days);
        self
    }

    /// Adds a holiday. A preferred-off entry on the same date is dropped.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.preferred_off.remove(&date);
        self.holidays.insert(date);
        self
    }

    /// Adds a preferred-off date unless it is already a holiday.
    pub fn with_preferred_off(mut self, date: NaiveDate) -> Self {
        if !self.holidays.contains(&date) {
            self.preferred_off.insert(date);
        }
        self
    }

    /// Whether the employee holds `skill`. [`ANY_SKILL`] is always held.
    pub fn has_skill(&self, skill: &str) -> bool {
        skill == ANY_SKILL || self.skills.contains(skill)
    }

    /// Holiday dates converted to day indices inside the horizon.
    pub fn holiday_days(&self, cfg: &Config) -> BTreeSet<usize> {
        self.holidays
            .iter()
            .filter_map(|date| cfg.day_index(*date))
            .collect()
    }

    /// Drops preferred-off dates that are also holidays. Useful after
    /// deserializing records assembled elsewhere.
    pub fn normalize(&mut self) {
        self.skills.insert(ANY_SKILL.to_string());
        let holidays = &self.holidays;
        self.preferred_off.retain(|d| !holidays.contains(d));
    }
}
