//! Input data: staff plus per-employee allowed-hour masks.

use serde::{Deserialize, Serialize};

use super::Staff;
use crate::config::Config;

/// Staff list and `N × hours` allowed-hour mask.
///
/// Consumed once at build time and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputData {
    /// Staff members, indexed by employee position `e`.
    pub staff: Vec<Staff>,
    /// `allowed[e][h]`: employee `e` may work hour-of-day `h`.
    pub allowed: Vec<Vec<bool>>,
}

impl InputData {
    /// Creates input data from an explicit mask.
    pub fn new(staff: Vec<Staff>, allowed: Vec<Vec<bool>>) -> Self {
        Self { staff, allowed }
    }

    /// Creates input data, deriving each mask from the night/day windows in
    /// `cfg` (see [`allowed_hours`]).
    pub fn from_staff(staff: Vec<Staff>, cfg: &Config) -> Self {
        let allowed = staff.iter().map(|s| allowed_hours(s, cfg)).collect();
        Self { staff, allowed }
    }

    /// Creates input data where everyone may work every hour.
    pub fn unrestricted(staff: Vec<Staff>, hours: usize) -> Self {
        let allowed = vec![vec![true; hours]; staff.len()];
        Self { staff, allowed }
    }

    /// Number of employees.
    pub fn len(&self) -> usize {
        self.staff.len()
    }

    /// Whether there are no employees.
    pub fn is_empty(&self) -> bool {
        self.staff.is_empty()
    }

    /// Whether employee `e` may work hour-of-day `h`.
    pub fn is_allowed(&self, e: usize, h: usize) -> bool {
        self.allowed
            .get(e)
            .and_then(|row| row.get(h))
            .copied()
            .unwrap_or(false)
    }
}

/// Allowed-hour mask for one staff member.
///
/// The night window runs from `night_shift_start` to `night_shift_end`
/// (wrapping); the day window is the complement, from `night_shift_end` to
/// `night_shift_start`. A night worker gets the night window plus
/// `night_to_day_slack_hours` from the start of the day window; a day
/// worker gets the day window plus `day_to_night_slack_hours` from the
/// start of the night window. Boundaries wrap modulo `cfg.hours`.
///
/// With the defaults (night 18→6, slacks 2 and 1) a night worker may work
/// `{18..23, 0..7}` and a day worker `{6..18}`.
pub fn allowed_hours(staff: &Staff, cfg: &Config) -> Vec<bool> {
    let period = cfg.hours;
    let mut allowed = vec![false; period];
    if period == 0 {
        return allowed;
    }
    let night_start = cfg.night_shift_start as usize % period;
    let day_start = cfg.night_shift_end as usize % period;

    let mut mark = |start: usize, len: usize| {
        for i in 0..len.min(period) {
            allowed[(start + i) % period] = true;
        }
    };
    let span = |from: usize, to: usize| match (to + period - from) % period {
        0 => period,
        len => len,
    };

    if staff.is_night_worker {
        mark(night_start, span(night_start, day_start));
        mark(day_start, cfg.night_to_day_slack_hours as usize);
    } else {
        mark(day_start, span(day_start, night_start));
        mark(night_start, cfg.day_to_night_slack_hours as usize);
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(mask: &[bool]) -> Vec<usize> {
        mask.iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(h, _)| h)
            .collect()
    }

    #[test]
    fn test_night_worker_mask() {
        let cfg = Config::default();
        let mask = allowed_hours(&Staff::new(0, "N").night_worker(), &cfg);
        let mut expected: Vec<usize> = (0..8).collect();
        expected.extend(18..24);
        assert_eq!(hours(&mask), expected);
    }

    #[test]
    fn test_day_worker_mask() {
        let cfg = Config::default();
        let mask = allowed_hours(&Staff::new(0, "D"), &cfg);
        assert_eq!(hours(&mask), (6..19).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_slack() {
        let cfg = Config::default().with_slack(0, 0);
        let night = allowed_hours(&Staff::new(0, "N").night_worker(), &cfg);
        let day = allowed_hours(&Staff::new(1, "D"), &cfg);
        assert_eq!(hours(&night).len(), 12);
        assert_eq!(hours(&day), (6..18).collect::<Vec<_>>());
        assert!(night.iter().zip(&day).all(|(n, d)| n != d));
    }

    #[test]
    fn test_short_day_wraps_boundaries() {
        let cfg = Config::new(2, 4).with_night_window(2, 0).with_slack(0, 0);
        let night = allowed_hours(&Staff::new(0, "N").night_worker(), &cfg);
        let day = allowed_hours(&Staff::new(1, "D"), &cfg);
        assert_eq!(hours(&night), vec![2, 3]);
        assert_eq!(hours(&day), vec![0, 1]);
    }

    #[test]
    fn test_input_accessors() {
        let data = InputData::unrestricted(vec![Staff::new(0, "A"), Staff::new(1, "B")], 4);
        assert_eq!(data.len(), 2);
        assert!(data.is_allowed(1, 3));
        assert!(!data.is_allowed(2, 0));
        assert!(!data.is_allowed(0, 4));
    }
}
