//! Derivation engine: today's record, XP, streak, and the activity log.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info};

use crate::export::{export_log, ExportPayload};
use crate::{
    AppState, Clock, CoreError, CoreResult, DayRecord, IdentityPatch, IdentityProfile, LogEntry,
    LogStatus, StateRepository, SystemClock, Tab, Task, TaskKind,
};

/// XP awarded per net completed task.
pub const XP_PER_TASK: i64 = 10;

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 500;

/// Minutes credited for one finished focus session.
pub const FOCUS_SESSION_MINUTES: u32 = 25;

const LOG_XP_GAIN: i32 = 10;

/// Owns the application state and applies every mutation to it.
///
/// The engine starts in a loading state. Until [`Engine::load`] runs, reads
/// see the default state and mutations fail with [`CoreError::NotLoaded`] so a
/// fresh default can never overwrite saved data.
#[derive(Debug)]
pub struct Engine<R, C = SystemClock> {
    repo: R,
    clock: C,
    state: AppState,
    loaded: bool,
}

impl<R: StateRepository, C: Clock> Engine<R, C> {
    /// Create an engine that has not loaded saved state yet.
    pub fn new(repo: R, clock: C) -> Self {
        Self {
            repo,
            clock,
            state: AppState::default(),
            loaded: false,
        }
    }

    /// Create an engine and load saved state immediately.
    pub fn open(repo: R, clock: C) -> Self {
        let mut engine = Self::new(repo, clock);
        engine.load();
        engine
    }

    /// Load saved state, falling back to defaults when none is usable.
    pub fn load(&mut self) {
        match self.repo.load() {
            Some(state) => {
                info!(
                    "event=state_load status=ok days={} log_entries={} xp={}",
                    state.history.len(),
                    state.event_log.len(),
                    state.identity.xp()
                );
                self.state = state;
            }
            None => {
                info!("event=state_load status=default");
                self.state = AppState::default();
            }
        }
        self.loaded = true;
    }

    /// Whether the initial load has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read-only view of the whole state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Identity profile with derived XP and level.
    pub fn identity(&self) -> &IdentityProfile {
        &self.state.identity
    }

    /// Currently selected tab.
    pub fn active_tab(&self) -> Tab {
        self.state.active_tab
    }

    /// Activity log in insertion order.
    pub fn event_log(&self) -> &[LogEntry] {
        &self.state.event_log
    }

    /// Underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Today's date key.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Today's record, synthesized from the template when nothing was written yet.
    ///
    /// Reading never inserts into history.
    pub fn current_day(&self) -> DayRecord {
        self.day_or_template(self.today())
    }

    /// Stored record for `date`, if that day was ever written.
    pub fn day(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.state.history.get(&date)
    }

    /// Apply `mutation` to today's record and derive XP and log changes.
    ///
    /// `changed_task` is the task as it was before a single boolean toggle; it
    /// appends one log entry recording the resulting direction. Bulk or
    /// non-boolean mutations pass `None` and only move XP.
    pub fn update_today<F>(&mut self, mutation: F, changed_task: Option<&Task>) -> CoreResult<()>
    where
        F: FnOnce(DayRecord) -> DayRecord,
    {
        self.ensure_loaded()?;
        let now = self.clock.now();
        let today = now.date();

        let before = self.day_or_template(today);
        let mut after = mutation(before.clone());
        after.clamp_accumulators();
        debug_assert_eq!(after.date, today, "mutation must not move the record to another day");

        let delta = count(after.completed_count()) - count(before.completed_count());
        self.state.identity.apply_completed_delta(delta);

        if let Some(task) = changed_task {
            let status = if task.completed {
                LogStatus::Uncompleted
            } else {
                LogStatus::Completed
            };
            let xp_gain = match status {
                LogStatus::Completed => LOG_XP_GAIN,
                LogStatus::Uncompleted => -LOG_XP_GAIN,
            };
            self.state.event_log.push(LogEntry {
                timestamp: now.format("%H:%M:%S").to_string(),
                date: today,
                task_name: task.label.clone(),
                category: task.category,
                status,
                xp_gain,
            });
        }

        debug!(
            "event=day_update date={today} completed_delta={delta} xp={} level={}",
            self.state.identity.xp(),
            self.state.identity.level()
        );
        self.state.history.insert(today, after);
        self.commit()
    }

    /// Flip one task's completion and log the toggle.
    pub fn toggle_task(&mut self, id: &str) -> CoreResult<LogStatus> {
        let prior = self
            .current_day()
            .task(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownTask(id.to_string()))?;
        let status = if prior.completed {
            LogStatus::Uncompleted
        } else {
            LogStatus::Completed
        };
        self.update_today(
            |mut day| {
                if let Some(task) = day.tasks.iter_mut().find(|task| task.id == prior.id) {
                    task.completed = !task.completed;
                }
                day
            },
            Some(&prior),
        )?;
        Ok(status)
    }

    /// Set the value of a numeric or scale task, clamped to `0..=target`.
    pub fn set_task_value(&mut self, id: &str, value: f64) -> CoreResult<()> {
        if !value.is_finite() {
            return Err(CoreError::Validation("task value must be a finite number".into()));
        }
        let task = self
            .current_day()
            .task(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownTask(id.to_string()))?;
        if task.kind == TaskKind::Boolean {
            return Err(CoreError::Validation(format!("{id} is done or not done; it has no value")));
        }
        self.update_today(
            |mut day| {
                if let Some(task) = day.tasks.iter_mut().find(|task| task.id == id) {
                    let upper = task.target.filter(|target| *target >= 0.0).unwrap_or(f64::MAX);
                    task.value = Some(value.max(0.0).min(upper));
                }
                day
            },
            None,
        )
    }

    /// Add `delta` litres of water; the total never drops below zero.
    pub fn adjust_water(&mut self, delta: f64) -> CoreResult<()> {
        if !delta.is_finite() {
            return Err(CoreError::Validation("water delta must be a finite number".into()));
        }
        self.update_today(
            |mut day| {
                day.water_intake = (day.water_intake + delta).max(0.0);
                day
            },
            None,
        )
    }

    /// Add deep-work minutes to today.
    pub fn add_deep_work_minutes(&mut self, minutes: u32) -> CoreResult<()> {
        self.update_today(
            |mut day| {
                day.deep_work_minutes = day.deep_work_minutes.saturating_add(minutes);
                day
            },
            None,
        )
    }

    /// Credit one finished focus session.
    pub fn record_focus_session(&mut self) -> CoreResult<()> {
        self.add_deep_work_minutes(FOCUS_SESSION_MINUTES)
    }

    /// Record or clear today's bedtime.
    pub fn set_sleep_time(&mut self, sleep_time: Option<String>) -> CoreResult<()> {
        let sleep_time = sleep_time
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self.update_today(
            |mut day| {
                day.sleep_time = sleep_time;
                day
            },
            None,
        )
    }

    /// Consecutive days with at least one completed task, ending today.
    pub fn streak(&self) -> u32 {
        compute_streak(&self.state.history, self.today())
    }

    /// Shallow-merge `patch` into the identity profile. XP is untouched.
    pub fn update_identity(&mut self, patch: IdentityPatch) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.state.identity.apply(patch);
        self.commit()
    }

    /// Persist the selected tab.
    pub fn set_tab(&mut self, tab: Tab) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.state.active_tab = tab;
        self.commit()
    }

    /// Render the activity log as a CSV document.
    pub fn export(&self) -> CoreResult<ExportPayload> {
        export_log(&self.state.event_log, self.clock.now())
    }

    /// Discard all history, the log, and identity edits.
    pub fn reset(&mut self) -> CoreResult<()> {
        self.ensure_loaded()?;
        info!(
            "event=state_reset days={} log_entries={}",
            self.state.history.len(),
            self.state.event_log.len()
        );
        self.state = AppState::default();
        self.commit()
    }

    fn day_or_template(&self, date: NaiveDate) -> DayRecord {
        self.state
            .history
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DayRecord::from_template(date))
    }

    fn ensure_loaded(&self) -> CoreResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(CoreError::NotLoaded)
        }
    }

    fn commit(&self) -> CoreResult<()> {
        self.repo.save(&self.state)
    }
}

/// Walk backward from `today` counting days with a completed task.
///
/// Today may be empty without breaking the chain; that exemption only applies
/// on the first step.
pub fn compute_streak(history: &BTreeMap<NaiveDate, DayRecord>, today: NaiveDate) -> u32 {
    let mut count = 0;
    let mut cursor = today;
    loop {
        let active = history.get(&cursor).is_some_and(DayRecord::has_completions);
        if active {
            count += 1;
        } else if cursor != today {
            break;
        }
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    count
}

fn count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn active(day: u32) -> (NaiveDate, DayRecord) {
        let mut record = DayRecord::from_template(date(day));
        record.tasks[0].completed = true;
        (date(day), record)
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(compute_streak(&BTreeMap::new(), date(10)), 0);
    }

    #[test]
    fn empty_today_is_skipped_once() {
        let history: BTreeMap<_, _> = [active(8), active(9)].into_iter().collect();
        assert_eq!(compute_streak(&history, date(10)), 2);
    }

    #[test]
    fn written_but_empty_today_is_also_skipped() {
        let mut history: BTreeMap<_, _> = [active(9)].into_iter().collect();
        history.insert(date(10), DayRecord::from_template(date(10)));
        assert_eq!(compute_streak(&history, date(10)), 1);
    }

    #[test]
    fn counts_today_and_previous_days() {
        let history: BTreeMap<_, _> = (6..=10).map(active).collect();
        assert_eq!(compute_streak(&history, date(10)), 5);
    }

    #[test]
    fn gap_before_yesterday_stops_the_walk() {
        let history: BTreeMap<_, _> = [active(7), active(9)].into_iter().collect();
        assert_eq!(compute_streak(&history, date(10)), 1);
    }

    #[test]
    fn empty_yesterday_breaks_the_chain() {
        let mut history: BTreeMap<_, _> = [active(8), active(10)].into_iter().collect();
        history.insert(date(9), DayRecord::from_template(date(9)));
        assert_eq!(compute_streak(&history, date(10)), 1);
    }
}
