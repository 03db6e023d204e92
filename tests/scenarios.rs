//! End-to-end roster scenarios solved with the Pumpkin backend.
//!
//! Run with `RUST_LOG=u_roster=debug` to see the build and solve logs.

use tracing_subscriber::EnvFilter;
use u_roster::config::{Config, CoverageBound};
use u_roster::cp::{PumpkinSolver, SolveStatus};
use u_roster::extract::SolvedVariables;
use u_roster::models::{InputData, Staff};
use u_roster::rules::{RuleKind, RuleRegistry, RuleSpec};
use u_roster::solve::solve_model;
use u_roster::{build_default_model, build_model, RosterModel};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn hard_core_registry() -> RuleRegistry {
    RuleRegistry::new(
        [
            RuleKind::Variables,
            RuleKind::Availability,
            RuleKind::ShiftInterval,
            RuleKind::MinShiftLength,
            RuleKind::Rest,
        ]
        .into_iter()
        .map(RuleSpec::builtin)
        .collect(),
    )
}

#[test]
fn test_max_consec_conflict_is_diagnosed() {
    init_tracing();
    let mut cfg = Config::new(2, 4)
        .with_shift_bounds(1, 4)
        .with_rest_hours(0)
        .with_weekly_max_hours(None)
        .with_time_limit(20.0)
        .with_workers(1);
    cfg.require_skill_in_slots("ANY", |_| true, |h| h == 0, 1, CoverageBound::Min);
    let data = InputData::unrestricted(vec![Staff::new(0, "Solo").with_max_consec_days(1)], 4);

    let mut roster = RosterModel::new(cfg, data);
    roster.build().unwrap();
    let result = roster.solve().unwrap();

    assert_eq!(result.status, SolveStatus::Infeasible);
    assert_eq!(result.status_name, "INFEASIBLE");
    assert!(result.hourly.is_empty());
    let labels = result
        .unsat_core_groups
        .get("MAX-CONSEC")
        .expect("MAX-CONSEC group");
    assert!(labels.iter().all(|l| l.starts_with("MAX-CONSEC[e=0,")));
}

#[test]
fn test_night_and_day_masks_hold_in_solution() {
    init_tracing();
    let mut cfg = Config::new(1, 24)
        .with_shift_bounds(2, 8)
        .with_rest_hours(0)
        .with_weekly_max_hours(None)
        .with_time_limit(20.0)
        .with_workers(1);
    cfg.require_skill_in_slots("ANY", |_| true, |h| h == 3 || h == 12, 1, CoverageBound::Min);
    let staff = vec![Staff::new(0, "Night").night_worker(), Staff::new(1, "Day")];
    let data = InputData::from_staff(staff, &cfg);

    let night: Vec<usize> = (0..24).filter(|h| data.is_allowed(0, *h)).collect();
    let mut expected: Vec<usize> = (0..8).collect();
    expected.extend(18..24);
    assert_eq!(night, expected);
    let day: Vec<usize> = (0..24).filter(|h| data.is_allowed(1, *h)).collect();
    assert_eq!(day, (6..19).collect::<Vec<_>>());

    let registry = hard_core_registry().with_spec(RuleSpec::builtin(RuleKind::Coverage));
    let ctx = build_model(cfg, data, &registry).unwrap();
    let outcome = solve_model(&ctx, &PumpkinSolver::new(), None);
    assert!(outcome.status.has_solution());
    let solved = SolvedVariables::from_response(&ctx, &outcome.response).unwrap();
    assert!(solved.worked[0][0][3], "only the night worker can cover hour 3");
    assert!(solved.worked[1][0][12], "only the day worker can cover hour 12");
    for (e, allowed) in [(0, &night), (1, &day)] {
        for h in 0..24 {
            if solved.worked[e][0][h] {
                assert!(allowed.contains(&h), "employee {e} works masked hour {h}");
            }
        }
    }
}

#[test]
fn test_rest_after_spilling_shift() {
    init_tracing();
    let cfg = Config::new(2, 24)
        .with_shift_bounds(1, 12)
        .with_rest_hours(12)
        .with_weekly_max_hours(None)
        .with_time_limit(20.0)
        .with_workers(1);
    let data = InputData::unrestricted(vec![Staff::new(0, "A")], 24);
    let mut ctx = build_model(cfg, data, &hard_core_registry()).unwrap();

    let y0 = ctx.vars.shift.get(&(0, 0)).unwrap();
    let y1 = ctx.vars.shift.get(&(0, 1)).unwrap();
    let s0 = ctx.vars.start.get(&(0, 0)).unwrap();
    let l0 = ctx.vars.length.get(&(0, 0)).unwrap();
    let s1 = ctx.vars.start.get(&(0, 1)).unwrap();
    ctx.model.add_eq(y0, 1);
    ctx.model.add_eq(y1, 1);
    ctx.model.add_eq(s0, 20);
    ctx.model.add_eq(l0, 6);
    ctx.model.minimize(s1);

    let outcome = solve_model(&ctx, &PumpkinSolver::new(), None);
    assert_eq!(outcome.status, SolveStatus::Optimal);
    assert_eq!(outcome.objective, Some(14));

    let solved = SolvedVariables::from_response(&ctx, &outcome.response).unwrap();
    assert!(solved.worked[0][1][0] && solved.worked[0][1][1]);
    assert!((2..14).all(|h| !solved.worked[0][1][h]));
    assert!((20..24).all(|h| solved.worked[0][0][h]));
}

#[test]
fn test_hours_match_declared_intervals() {
    init_tracing();
    let mut cfg = Config::new(2, 6)
        .with_shift_bounds(2, 5)
        .with_rest_hours(2)
        .with_weekly_max_hours(Some(8))
        .with_time_limit(20.0)
        .with_workers(2);
    cfg.require_skill_in_slots("ANY", |_| true, |h| (1..4).contains(&h), 1, CoverageBound::Min);
    cfg.require_skill_in_slots("ANY", |d| d == 1, |h| h == 0, 1, CoverageBound::Min);
    let data = InputData::unrestricted(vec![Staff::new(0, "A"), Staff::new(1, "B").with_band(2)], 6);

    let ctx = build_default_model(cfg, data).unwrap();
    let outcome = solve_model(&ctx, &PumpkinSolver::new(), None);
    assert!(outcome.status.has_solution());
    let solved = SolvedVariables::from_response(&ctx, &outcome.response).unwrap();

    let period = 6;
    for e in 0..2 {
        for d in 0..2 {
            for h in 0..period {
                let today = solved.intervals[e][d]
                    .is_some_and(|i| (i.start as usize) <= h && h < (i.start + i.length) as usize);
                let spilled = d > 0
                    && solved.intervals[e][d - 1]
                        .is_some_and(|i| h + period < (i.start + i.length) as usize);
                assert_eq!(solved.worked[e][d][h], today || spilled, "x[{e},{d},{h}]");
            }
        }
        assert!(solved.hours_of(e) <= 8);
    }
}

#[test]
fn test_build_is_deterministic() {
    let mut cfg = Config::new(3, 8)
        .with_shift_bounds(2, 6)
        .with_rest_hours(4)
        .with_weekly_max_hours(Some(16));
    cfg.require_skill_everywhere("ANY", 1, CoverageBound::Min);
    cfg.require_skill_in_slots("RN", |_| true, |h| h < 4, 1, CoverageBound::Min);
    let staff = vec![
        Staff::new(0, "A").with_skill("RN"),
        Staff::new(1, "B").night_worker(),
        Staff::new(2, "C").with_band(3).with_max_consec_days(2),
    ];
    let data = InputData::from_staff(staff, &cfg);

    let a = build_default_model(cfg.clone(), data.clone()).unwrap();
    let b = build_default_model(cfg, data).unwrap();
    assert_eq!(a.model_stats(), b.model_stats());
    assert_eq!(a.model.num_vars(), b.model.num_vars());
    assert_eq!(a.model.constraints(), b.model.constraints());
}

#[test]
fn test_default_pipeline_result_round_trips_as_json() {
    init_tracing();
    let mut cfg = Config::new(2, 4)
        .with_shift_bounds(1, 3)
        .with_rest_hours(0)
        .with_weekly_max_hours(None)
        .with_time_limit(10.0)
        .with_workers(1);
    cfg.require_skill_in_slots("ANY", |_| true, |h| h == 1, 1, CoverageBound::Min);
    let data = InputData::unrestricted(vec![Staff::new(0, "A"), Staff::new(1, "B")], 4);

    let mut roster = RosterModel::new(cfg, data);
    roster.build().unwrap();
    let result = roster.solve().unwrap();
    assert!(result.status.has_solution());
    assert!(!result.progress_history.is_empty());

    let json = serde_json::to_string(&result).unwrap();
    let back: u_roster::SolveResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.hourly, result.hourly);
    assert_eq!(back.status, result.status);
}

#[test]
fn test_full_week_single_coverage_is_solved() {
    init_tracing();
    let mut cfg = Config::new(7, 24).with_time_limit(60.0).with_log_frequency(1.0);
    cfg.require_skill_everywhere("ANY", 1, CoverageBound::Min);
    let staff = (0..6).map(|i| Staff::new(i, format!("S{i}"))).collect();
    let data = InputData::unrestricted(staff, 24);

    let mut roster = RosterModel::new(cfg, data);
    assert!(roster.precheck().is_clean());
    roster.build().unwrap();
    let result = roster.solve().unwrap();

    assert!(result.status.has_solution(), "status {}", result.status_name);
    for d in 0..7 {
        for h in 0..24 {
            assert!(
                result.hourly.iter().any(|r| r.day == d && r.hour == h),
                "slot ({d},{h}) uncovered"
            );
        }
    }
    assert!(result.employees.iter().all(|e| e.hours <= 40));
    assert!(result.objective_value.is_some());
    assert!(result.best_bound <= result.objective_value);
}
