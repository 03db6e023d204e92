//! Input validation for rostering problems.
//!
//! Checks configuration and input data before any model is built.
//! Detects:
//! - Empty horizons and inconsistent shift bounds
//! - Rest and weekly caps that cannot fit the horizon
//! - Non-positive solver limits
//! - Night window hours outside a 24-hour clock
//! - Coverage grids or allowed masks whose shape disagrees with the horizon
//! - Empty staff lists, duplicate staff IDs and zero bands
//!
//! All problems are collected; nothing stops at the first error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::{Config, SkillGrid};
use crate::models::InputData;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// `days` or `hours` is zero.
    InvalidHorizon,
    /// Shift bounds violate `0 < min ≤ max ≤ hours`.
    InvalidShiftBounds,
    /// Rest exceeds a day.
    InvalidRestHours,
    /// Weekly cap exceeds the horizon.
    InvalidWeeklyCap,
    /// Time limit, worker count or log interval out of range.
    InvalidSolverSetting,
    /// Night window boundary outside `0..=23`.
    InvalidShiftWindow,
    /// A coverage grid is not `days × hours`.
    GridShapeMismatch,
    /// The allowed mask is not `N × hours`.
    MaskShapeMismatch,
    /// No staff.
    EmptyStaff,
    /// Two staff members share an ID.
    DuplicateId,
    /// A staff band is zero.
    InvalidBand,
}

impl ValidationError {
    /// Creates an error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a configuration.
///
/// Checks:
/// 1. `days > 0` and `hours > 0`
/// 2. `0 < min_shift_hours ≤ max_shift_hours ≤ hours`
/// 3. `rest_hours ≤ hours`
/// 4. `weekly_max_hours ≤ days × hours` when set
/// 5. Positive time limit, at least one worker, non-negative log interval
/// 6. Night window boundaries in `0..=23`
/// 7. Non-empty coverage grids are exactly `days × hours`
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_config(cfg: &Config) -> ValidationResult {
    let mut errors = Vec::new();
    let hours = cfg.hours as u64;

    if cfg.days == 0 || cfg.hours == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidHorizon,
            format!("Horizon must be non-empty, got {} days × {} hours", cfg.days, cfg.hours),
        ));
    }

    let (min, max) = (u64::from(cfg.min_shift_hours), u64::from(cfg.max_shift_hours));
    if !(0 < min && min <= max && max <= hours) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidShiftBounds,
            format!("Require 0 < MIN_SHIFT_HOURS ({min}) <= MAX_SHIFT_HOURS ({max}) <= HOURS ({hours})"),
        ));
    }

    if u64::from(cfg.rest_hours) > hours {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidRestHours,
            format!("REST_HOURS ({}) must be in [0, {hours}]", cfg.rest_hours),
        ));
    }

    if let Some(cap) = cfg.weekly_max_hours {
        let horizon = cfg.days as u64 * hours;
        if u64::from(cap) > horizon {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWeeklyCap,
                format!("WEEKLY_MAX_HOURS ({cap}) too large for a {horizon}-hour horizon"),
            ));
        }
    }

    if cfg.time_limit_sec <= 0.0 || !cfg.time_limit_sec.is_finite() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSolverSetting,
            format!("TIME_LIMIT_SEC must be > 0, got {}", cfg.time_limit_sec),
        ));
    }
    if cfg.num_parallel_workers == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSolverSetting,
            "NUM_PARALLEL_WORKERS must be > 0",
        ));
    }
    if cfg.log_solutions_frequency_sec < 0.0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSolverSetting,
            "LOG_SOLUTIONS_FREQUENCY_SECONDS must be non-negative",
        ));
    }

    for (name, value) in [
        ("NIGHT_SHIFT_START", cfg.night_shift_start),
        ("NIGHT_SHIFT_END", cfg.night_shift_end),
    ] {
        if value > 23 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidShiftWindow,
                format!("{name} ({value}) must be within [0, 23]"),
            ));
        }
    }

    for (name, grid) in [("SKILL_MIN", &cfg.skill_min), ("SKILL_MAX", &cfg.skill_max)] {
        if let Some(message) = grid_shape_error(name, grid, cfg.days, cfg.hours) {
            errors.push(ValidationError::new(ValidationErrorKind::GridShapeMismatch, message));
        }
    }

    finish(errors)
}

fn grid_shape_error(name: &str, grid: &SkillGrid, days: usize, hours: usize) -> Option<String> {
    if grid.is_empty() {
        return None;
    }
    if grid.len() != days {
        return Some(format!("{name} has {} days, expected {days}", grid.len()));
    }
    grid.iter()
        .position(|row| row.len() != hours)
        .map(|d| format!("{name} day {d} has {} hours, expected {hours}", grid[d].len()))
}

/// Validates input data against a configuration.
///
/// Checks:
/// 1. At least one staff member
/// 2. No duplicate staff IDs
/// 3. Every band is at least 1
/// 4. The allowed mask has one row of `hours` entries per staff member
pub fn validate_input(cfg: &Config, data: &InputData) -> ValidationResult {
    let mut errors = Vec::new();

    if data.staff.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyStaff,
            "Staff list is empty",
        ));
    }

    let mut ids = HashSet::new();
    for s in &data.staff {
        if !ids.insert(s.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate staff ID: {}", s.id),
            ));
        }
        if s.band == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidBand,
                format!("Staff {} has band 0; bands start at 1", s.id),
            ));
        }
    }

    if data.allowed.len() != data.staff.len() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MaskShapeMismatch,
            format!(
                "Allowed mask has {} rows for {} staff",
                data.allowed.len(),
                data.staff.len()
            ),
        ));
    }
    for (e, row) in data.allowed.iter().enumerate() {
        if row.len() != cfg.hours {
            errors.push(ValidationError::new(
                ValidationErrorKind::MaskShapeMismatch,
                format!("Allowed mask row {e} has {} hours, expected {}", row.len(), cfg.hours),
            ));
        }
    }

    finish(errors)
}

/// Validates configuration and input together, collecting both sets of
/// errors.
pub fn validate_problem(cfg: &Config, data: &InputData) -> ValidationResult {
    let mut errors = validate_config(cfg).err().unwrap_or_default();
    errors.extend(validate_input(cfg, data).err().unwrap_or_default());
    finish(errors)
}
