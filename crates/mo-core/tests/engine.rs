use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use mo_core::{
    AppState, CoreError, DayRecord, Engine, FixedClock, IdentityList, IdentityPatch, LogStatus,
    MemoryRepository, StateRepository, Tab,
};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

fn engine_at(day: u32) -> Engine<MemoryRepository, Arc<FixedClock>> {
    Engine::open(MemoryRepository::new(), Arc::new(FixedClock::new(at(day, 8))))
}

#[test]
fn reading_today_does_not_create_history() {
    let engine = engine_at(17);
    let first = engine.current_day();
    let second = engine.current_day();
    assert_eq!(first, second);
    assert!(engine.state().history.is_empty());
    assert_eq!(engine.repository().save_count(), 0);
}

#[test]
fn toggling_twice_restores_tasks_and_logs_both_directions() {
    let mut engine = engine_at(17);
    let original = engine.current_day();

    assert_eq!(engine.toggle_task("walk").unwrap(), LogStatus::Completed);
    assert_eq!(engine.identity().xp(), 10);
    assert_eq!(engine.toggle_task("walk").unwrap(), LogStatus::Uncompleted);

    assert_eq!(engine.current_day().tasks, original.tasks);
    assert_eq!(engine.identity().xp(), 0);

    let log = engine.event_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].status, LogStatus::Completed);
    assert_eq!(log[0].xp_gain, 10);
    assert_eq!(log[1].status, LogStatus::Uncompleted);
    assert_eq!(log[1].xp_gain, -10);
    assert_eq!(log[0].task_name, "30 min Walk");
    assert_eq!(log[0].timestamp, "08:15:00");
}

#[test]
fn bulk_mutation_moves_xp_by_net_delta_without_logging() {
    let mut engine = engine_at(17);
    engine
        .update_today(
            |mut day| {
                for task in day.tasks.iter_mut().take(4) {
                    task.completed = true;
                }
                day
            },
            None,
        )
        .unwrap();
    assert_eq!(engine.identity().xp(), 40);
    assert!(engine.event_log().is_empty());

    engine
        .update_today(
            |mut day| {
                day.tasks[0].completed = false;
                day.tasks[1].completed = false;
                day.tasks[5].completed = true;
                day
            },
            None,
        )
        .unwrap();
    assert_eq!(engine.identity().xp(), 30);
}

#[test]
fn xp_clamps_at_zero_and_level_follows_every_mutation() {
    let mut state = AppState::default();
    let mut yesterday = DayRecord::from_template(at(16, 8).date());
    yesterday.tasks[0].completed = true;
    state.history.insert(yesterday.date, yesterday);
    let mut today = DayRecord::from_template(at(17, 8).date());
    for task in &mut today.tasks {
        task.completed = true;
    }
    state.history.insert(today.date, today);
    state.identity = state.identity.with_xp(495);

    let clock = Arc::new(FixedClock::new(at(17, 8)));
    let mut engine = Engine::open(MemoryRepository::with_state(state), clock);

    engine.toggle_task("walk").unwrap();
    assert_eq!(engine.identity().xp(), 485);
    assert_eq!(engine.identity().level(), 1);

    engine
        .update_today(
            |mut day| {
                for task in &mut day.tasks {
                    task.completed = false;
                }
                day
            },
            None,
        )
        .unwrap();
    assert_eq!(engine.identity().xp(), 365);

    engine
        .update_today(
            |mut day| {
                for task in &mut day.tasks {
                    task.completed = true;
                }
                day
            },
            None,
        )
        .unwrap();
    assert_eq!(engine.identity().xp(), 495);
    assert_eq!(engine.identity().level(), 1);

    engine.toggle_task("zikr").unwrap();
    engine.toggle_task("zikr").unwrap();
    assert_eq!(engine.identity().xp(), 495);

    let mut done = DayRecord::from_template(at(17, 8).date());
    done.tasks[0].completed = true;
    done.tasks[1].completed = true;
    let mut small = Engine::open(
        MemoryRepository::with_state(AppState {
            history: [(done.date, done)].into_iter().collect(),
            identity: AppState::default().identity.with_xp(5),
            ..AppState::default()
        }),
        Arc::new(FixedClock::new(at(17, 8))),
    );
    small.toggle_task("walk").unwrap();
    assert_eq!(small.identity().xp(), 0);
    small.toggle_task("workout").unwrap();
    assert_eq!(small.identity().xp(), 0);
    small.toggle_task("workout").unwrap();
    assert_eq!(small.identity().xp(), 10);
    assert_eq!(small.identity().level(), 1);
}

#[test]
fn level_rolls_over_at_five_hundred() {
    let state = AppState {
        identity: AppState::default().identity.with_xp(490),
        ..AppState::default()
    };
    let mut engine = Engine::open(
        MemoryRepository::with_state(state),
        Arc::new(FixedClock::new(at(17, 8))),
    );
    engine.toggle_task("prayers").unwrap();
    assert_eq!(engine.identity().xp(), 500);
    assert_eq!(engine.identity().level(), 2);
    engine.toggle_task("prayers").unwrap();
    assert_eq!(engine.identity().level(), 1);
}

#[test]
fn accumulators_never_go_negative() {
    let mut engine = engine_at(17);
    engine.adjust_water(0.5).unwrap();
    engine.adjust_water(-2.0).unwrap();
    assert!(engine.current_day().water_intake.abs() < f64::EPSILON);

    engine
        .update_today(
            |mut day| {
                day.water_intake = -3.0;
                day
            },
            None,
        )
        .unwrap();
    assert!(engine.current_day().water_intake.abs() < f64::EPSILON);
    assert!(matches!(
        engine.adjust_water(f64::INFINITY),
        Err(CoreError::Validation(_))
    ));
}

#[test]
fn focus_sessions_add_twenty_five_minutes() {
    let mut engine = engine_at(17);
    engine.record_focus_session().unwrap();
    engine.record_focus_session().unwrap();
    assert_eq!(engine.current_day().deep_work_minutes, 50);
    assert_eq!(engine.identity().xp(), 0);
    assert!(engine.event_log().is_empty());
}

#[test]
fn scale_values_clamp_to_target() {
    let mut engine = engine_at(17);
    engine.set_task_value("khushu", 14.0).unwrap();
    assert_eq!(engine.current_day().task("khushu").unwrap().value, Some(10.0));
    engine.set_task_value("khushu", -1.0).unwrap();
    assert_eq!(engine.current_day().task("khushu").unwrap().value, Some(0.0));
    assert!(matches!(
        engine.set_task_value("missing", 1.0),
        Err(CoreError::UnknownTask(_))
    ));
}

#[test]
fn boolean_tasks_reject_values() {
    let mut engine = engine_at(17);
    assert!(matches!(
        engine.set_task_value("walk", 7.0),
        Err(CoreError::Validation(_))
    ));
    assert_eq!(engine.current_day().task("walk").unwrap().value, None);
    assert!(engine.state().history.is_empty());
}

#[test]
fn malformed_targets_do_not_break_value_updates() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
    let mut day = DayRecord::from_template(date);
    let khushu = day.tasks.iter_mut().find(|task| task.id == "khushu").unwrap();
    khushu.target = Some(-1.0);
    let mut state = AppState::default();
    state.history.insert(date, day);

    let mut engine = Engine::open(
        MemoryRepository::with_state(state),
        Arc::new(FixedClock::new(at(17, 8))),
    );
    engine.set_task_value("khushu", 3.0).unwrap();
    assert_eq!(engine.current_day().task("khushu").unwrap().value, Some(3.0));

    engine
        .update_today(
            |mut day| {
                if let Some(task) = day.tasks.iter_mut().find(|task| task.id == "khushu") {
                    task.target = Some(f64::NAN);
                }
                day
            },
            None,
        )
        .unwrap();
    engine.set_task_value("khushu", -4.0).unwrap();
    assert_eq!(engine.current_day().task("khushu").unwrap().value, Some(0.0));
}

#[test]
fn log_timestamps_follow_the_clock() {
    let clock = Arc::new(FixedClock::new(at(17, 8)));
    let mut engine = Engine::open(MemoryRepository::new(), Arc::clone(&clock));
    engine.toggle_task("walk").unwrap();
    clock.set(at(17, 21));
    engine.toggle_task("sun").unwrap();

    let times: Vec<&str> = engine
        .event_log()
        .iter()
        .map(|entry| entry.timestamp.as_str())
        .collect();
    assert_eq!(times, vec!["08:15:00", "21:15:00"]);
    assert_eq!(engine.state().history.len(), 1);
}

#[test]
fn unknown_task_toggle_is_rejected() {
    let mut engine = engine_at(17);
    assert!(matches!(engine.toggle_task("nope"), Err(CoreError::UnknownTask(_))));
    assert!(engine.state().history.is_empty());
}

#[test]
fn streak_follows_the_calendar() {
    let clock = Arc::new(FixedClock::new(at(14, 21)));
    let mut engine = Engine::open(MemoryRepository::new(), Arc::clone(&clock));
    assert_eq!(engine.streak(), 0);

    engine.toggle_task("walk").unwrap();
    clock.advance_days(1);
    engine.toggle_task("walk").unwrap();
    clock.advance_days(1);
    assert_eq!(engine.streak(), 2);

    engine.toggle_task("sun").unwrap();
    assert_eq!(engine.streak(), 3);

    clock.advance_days(2);
    assert_eq!(engine.streak(), 0);
}

#[test]
fn new_day_starts_from_template() {
    let clock = Arc::new(FixedClock::new(at(16, 23)));
    let mut engine = Engine::open(MemoryRepository::new(), Arc::clone(&clock));
    engine.toggle_task("walk").unwrap();
    engine.adjust_water(1.5).unwrap();

    clock.advance_days(1);
    let today = engine.current_day();
    assert_eq!(today.date, at(17, 23).date());
    assert_eq!(today.completed_count(), 0);
    assert!(today.water_intake.abs() < f64::EPSILON);
    assert_eq!(engine.state().history.len(), 1);
}

#[test]
fn identity_updates_merge_without_touching_xp() {
    let mut engine = engine_at(17);
    engine.toggle_task("walk").unwrap();

    let values = engine
        .identity()
        .with_item_added(IdentityList::CoreValues, "Courage");
    engine
        .update_identity(IdentityPatch::list(IdentityList::CoreValues, values))
        .unwrap();
    engine
        .update_identity(IdentityPatch::vision("Builder of quiet strength"))
        .unwrap();

    let identity = engine.identity();
    assert_eq!(identity.vision, "Builder of quiet strength");
    assert_eq!(identity.core_values.last().map(String::as_str), Some("Courage"));
    assert_eq!(identity.non_negotiables.len(), 3);
    assert_eq!(identity.xp(), 10);
}

#[test]
fn every_mutation_is_saved() {
    let mut engine = engine_at(17);
    engine.toggle_task("walk").unwrap();
    engine.set_tab(Tab::Identity).unwrap();
    engine.update_identity(IdentityPatch::vision("x")).unwrap();
    assert_eq!(engine.repository().save_count(), 3);

    let stored = engine.repository().stored().unwrap();
    assert_eq!(stored.active_tab, Tab::Identity);
    assert_eq!(stored, *engine.state());
}

#[test]
fn mutations_before_load_are_refused() {
    let repo = MemoryRepository::new();
    let mut engine = Engine::new(repo, Arc::new(FixedClock::new(at(17, 8))));
    assert!(!engine.is_loaded());
    assert!(matches!(engine.toggle_task("walk"), Err(CoreError::NotLoaded)));
    assert!(matches!(engine.set_tab(Tab::Focus), Err(CoreError::NotLoaded)));
    assert!(engine.repository().load().is_none());

    engine.load();
    assert!(engine.is_loaded());
    engine.set_tab(Tab::Focus).unwrap();
}

#[test]
fn export_requires_log_entries() {
    let mut engine = engine_at(17);
    assert!(matches!(engine.export(), Err(CoreError::EmptyLog)));

    engine.toggle_task("no_scroll").unwrap();
    let payload = engine.export().unwrap();
    assert_eq!(payload.rows, 1);
    assert!(payload.file_name.starts_with("mastery_log_2026-10-17_"));
    assert_eq!(
        payload.contents,
        "Date,Time,Task Name,Category,Status,XP Gain\n\
         2026-10-17,08:15:00,\"No Mindless Scrolling\",Mind,Completed,10"
    );
}

#[test]
fn reset_restores_defaults() {
    let mut engine = engine_at(17);
    engine.toggle_task("walk").unwrap();
    engine.reset().unwrap();
    assert_eq!(*engine.state(), AppState::default());
    assert_eq!(engine.repository().stored(), Some(AppState::default()));
}
