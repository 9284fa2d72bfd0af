//! Core domain entities, rules, and traits for MasteryOS.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod engine;
mod export;

pub use engine::{compute_streak, Engine, FOCUS_SESSION_MINUTES, XP_PER_LEVEL, XP_PER_TASK};
pub use export::{export_file_name, export_log, render_csv, ExportPayload, CSV_HEADER};

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by core validation and domain rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Returned when a validation rule is violated.
    #[error("validation error: {0}")]
    Validation(String),
    /// Returned when repository operations fail.
    #[error("storage error: {0}")]
    Storage(String),
    /// Returned when exporting while the activity log has no entries.
    #[error("no activity logged yet; complete a task before exporting")]
    EmptyLog,
    /// Returned when a mutation names a task that is not part of today.
    #[error("unknown task: {0}")]
    UnknownTask(String),
    /// Returned when a mutation runs before the saved state was loaded.
    #[error("state has not finished loading")]
    NotLoaded,
}

/// Life areas a habit belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Physical health.
    Body,
    /// Learning and focus.
    Mind,
    /// Faith practice.
    Deen,
    /// Work and craft.
    Career,
    /// Relationships.
    Social,
}

impl Category {
    /// Human-readable name, also used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Body => "Body",
            Category::Mind => "Mind",
            Category::Deen => "Deen",
            Category::Career => "Career",
            Category::Social => "Social",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a task's completion and value are interpreted.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Done or not done.
    #[default]
    Boolean,
    /// Free numeric value.
    Numeric,
    /// Bounded rating between zero and `target`.
    Scale,
}

/// A unit of daily behavior.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable identifier, unique within a day.
    pub id: String,
    /// Display text.
    pub label: String,
    /// Life area.
    pub category: Category,
    /// Whether the task is checked off.
    pub completed: bool,
    /// Older saves predate this field; they only held boolean tasks.
    #[serde(rename = "type", default)]
    pub kind: TaskKind,
    /// Current value for numeric and scale tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Upper bound for numeric and scale tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

impl Task {
    /// Create an incomplete boolean task.
    pub fn new(id: impl Into<String>, label: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category,
            completed: false,
            kind: TaskKind::Boolean,
            value: None,
            target: None,
        }
    }

    /// Create an incomplete scale task with a default value and an upper bound.
    pub fn scale(
        id: impl Into<String>,
        label: impl Into<String>,
        category: Category,
        value: f64,
        target: f64,
    ) -> Self {
        Self {
            kind: TaskKind::Scale,
            value: Some(value),
            target: Some(target),
            ..Self::new(id, label, category)
        }
    }
}

/// The fixed canonical list of habits every new day starts from.
pub fn task_template() -> Vec<Task> {
    vec![
        Task::new("walk", "30 min Walk", Category::Body),
        Task::new("workout", "20 min Workout", Category::Body),
        Task::new("sun", "Sunlight Exposure", Category::Body),
        Task::new("protein", "Protein-Focused Meal", Category::Body),
        Task::new("sleep", "Sleep by 11:00 PM", Category::Body),
        Task::new("learning", "3h Deep Learning", Category::Mind),
        Task::new("brand", "Content Posting", Category::Mind),
        Task::new("uncomfortable", "1 Uncomfortable Thing", Category::Mind),
        Task::new("no_scroll", "No Mindless Scrolling", Category::Mind),
        Task::new("prayers", "5 Daily Prayers", Category::Deen),
        Task::scale("khushu", "Khushu (1-10)", Category::Deen, 5.0, 10.0),
        Task::new("zikr", "Zikr", Category::Deen),
        Task::new("tilawat", "Tilawat", Category::Deen),
    ]
}

/// One calendar day's tracked tasks and metrics.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    /// Calendar date, the natural key in history.
    pub date: NaiveDate,
    /// Tasks in template order.
    pub tasks: Vec<Task>,
    /// Accumulated deep-work minutes.
    pub deep_work_minutes: u32,
    /// Water intake in litres.
    pub water_intake: f64,
    /// Optional bedtime note, such as `22:45`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<String>,
}

impl DayRecord {
    /// Build a fresh record for `date` with every template task incomplete.
    pub fn from_template(date: NaiveDate) -> Self {
        Self {
            date,
            tasks: task_template(),
            deep_work_minutes: 0,
            water_intake: 0.0,
            sleep_time: None,
        }
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Number of completed tasks.
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    /// True when at least one task is completed.
    pub fn has_completions(&self) -> bool {
        self.tasks.iter().any(|task| task.completed)
    }

    /// Share of completed tasks, rounded to a whole percent.
    pub fn completion_percent(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let percent = (self.completed_count() * 100 + self.tasks.len() / 2) / self.tasks.len();
        u8::try_from(percent).unwrap_or(100)
    }

    pub(crate) fn clamp_accumulators(&mut self) {
        if !(self.water_intake.is_finite() && self.water_intake > 0.0) {
            self.water_intake = 0.0;
        }
    }
}

/// Direction of a task toggle.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum LogStatus {
    /// The task went from open to done.
    Completed,
    /// The task went from done back to open.
    Uncompleted,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Completed => f.write_str("Completed"),
            LogStatus::Uncompleted => f.write_str("Uncompleted"),
        }
    }
}

/// Immutable record of one task toggle.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Local time of day, `HH:MM:SS`.
    pub timestamp: String,
    /// Day the toggle affected.
    pub date: NaiveDate,
    /// Task label at the time of the toggle.
    pub task_name: String,
    /// Task category.
    pub category: Category,
    /// Resulting direction.
    pub status: LogStatus,
    /// Signed XP attributed to the toggle.
    pub xp_gain: i32,
}

/// The three editable identity lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityList {
    /// Principles to live by.
    CoreValues,
    /// Rules never broken.
    NonNegotiables,
    /// Traits to reject.
    AntiIdentity,
}

impl IdentityList {
    /// All lists in display order.
    pub const ALL: [IdentityList; 3] = [
        IdentityList::CoreValues,
        IdentityList::NonNegotiables,
        IdentityList::AntiIdentity,
    ];

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            IdentityList::CoreValues => "Core Values",
            IdentityList::NonNegotiables => "Non-Negotiables",
            IdentityList::AntiIdentity => "Anti-Identity",
        }
    }
}

impl FromStr for IdentityList {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "values" | "corevalues" => Ok(IdentityList::CoreValues),
            "nonnegotiables" | "rules" => Ok(IdentityList::NonNegotiables),
            "antiidentity" | "anti" => Ok(IdentityList::AntiIdentity),
            other => Err(CoreError::Validation(format!("unknown identity list: {other}"))),
        }
    }
}

/// User-authored self-concept plus derived progression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityProfile {
    /// Vision statement.
    pub vision: String,
    /// Core values.
    pub core_values: Vec<String>,
    /// Non-negotiable rules.
    pub non_negotiables: Vec<String>,
    /// Traits the user rejects.
    pub anti_identity: Vec<String>,
    xp: u64,
}

impl Default for IdentityProfile {
    fn default() -> Self {
        Self::new(
            "The Man I Am Becoming in 2026",
            strings(&["Discipline", "Integrity", "Excellence"]),
            strings(&["Never miss a prayer", "Early wake up", "Consistency"]),
            strings(&["Complacency", "Escapism", "Arrogance"]),
        )
    }
}

impl IdentityProfile {
    /// Create a profile with zero XP.
    pub fn new(
        vision: impl Into<String>,
        core_values: Vec<String>,
        non_negotiables: Vec<String>,
        anti_identity: Vec<String>,
    ) -> Self {
        Self {
            vision: vision.into(),
            core_values,
            non_negotiables,
            anti_identity,
            xp: 0,
        }
    }

    /// Restore previously earned XP.
    #[must_use]
    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = xp;
        self
    }

    /// Accumulated XP.
    pub fn xp(&self) -> u64 {
        self.xp
    }

    /// Level derived from XP; never stored.
    pub fn level(&self) -> u64 {
        self.xp / XP_PER_LEVEL + 1
    }

    /// XP earned inside the current level.
    pub fn xp_into_level(&self) -> u64 {
        self.xp % XP_PER_LEVEL
    }

    /// Borrow one of the identity lists.
    pub fn list(&self, list: IdentityList) -> &[String] {
        match list {
            IdentityList::CoreValues => &self.core_values,
            IdentityList::NonNegotiables => &self.non_negotiables,
            IdentityList::AntiIdentity => &self.anti_identity,
        }
    }

    /// Copy of `list` with `item` appended; blank items leave it unchanged.
    pub fn with_item_added(&self, list: IdentityList, item: &str) -> Vec<String> {
        let mut items = self.list(list).to_vec();
        let item = item.trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
        items
    }

    /// Copy of `list` without the item at `index`; out-of-range indexes leave it unchanged.
    pub fn with_item_removed(&self, list: IdentityList, index: usize) -> Vec<String> {
        self.list(list)
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, item)| item.clone())
            .collect()
    }

    pub(crate) fn apply_completed_delta(&mut self, delta: i64) {
        let current = i64::try_from(self.xp).unwrap_or(i64::MAX);
        let next = current.saturating_add(delta.saturating_mul(XP_PER_TASK));
        self.xp = u64::try_from(next).unwrap_or(0);
    }

    pub(crate) fn apply(&mut self, patch: IdentityPatch) {
        if let Some(vision) = patch.vision {
            self.vision = vision;
        }
        if let Some(core_values) = patch.core_values {
            self.core_values = core_values;
        }
        if let Some(non_negotiables) = patch.non_negotiables {
            self.non_negotiables = non_negotiables;
        }
        if let Some(anti_identity) = patch.anti_identity {
            self.anti_identity = anti_identity;
        }
    }
}

/// A shallow, partial update to the identity profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityPatch {
    /// Replacement vision statement.
    pub vision: Option<String>,
    /// Replacement core values.
    pub core_values: Option<Vec<String>>,
    /// Replacement non-negotiables.
    pub non_negotiables: Option<Vec<String>>,
    /// Replacement anti-identity list.
    pub anti_identity: Option<Vec<String>>,
}

impl IdentityPatch {
    /// Patch that only replaces the vision.
    pub fn vision(vision: impl Into<String>) -> Self {
        Self {
            vision: Some(vision.into()),
            ..Self::default()
        }
    }

    /// Patch that replaces one list wholesale.
    pub fn list(list: IdentityList, items: Vec<String>) -> Self {
        let mut patch = Self::default();
        match list {
            IdentityList::CoreValues => patch.core_values = Some(items),
            IdentityList::NonNegotiables => patch.non_negotiables = Some(items),
            IdentityList::AntiIdentity => patch.anti_identity = Some(items),
        }
        patch
    }
}

/// Top-level views of the application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    /// Today's habits and vitals.
    #[default]
    Dashboard,
    /// Deep-work timer.
    Focus,
    /// Identity editor.
    Identity,
}

impl Tab {
    /// All tabs in navigation order.
    pub const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Focus, Tab::Identity];

    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Focus => "focus",
            Tab::Identity => "identity",
        }
    }

    /// Position in navigation order.
    pub fn index(self) -> usize {
        match self {
            Tab::Dashboard => 0,
            Tab::Focus => 1,
            Tab::Identity => 2,
        }
    }

    /// Next tab, wrapping around.
    #[must_use]
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous tab, wrapping around.
    #[must_use]
    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(Tab::Dashboard),
            "focus" => Ok(Tab::Focus),
            "identity" => Ok(Tab::Identity),
            other => Err(CoreError::Validation(format!("unknown tab: {other}"))),
        }
    }
}

/// Root aggregate persisted as a single blob.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Day records keyed by calendar date.
    pub history: BTreeMap<NaiveDate, DayRecord>,
    /// Append-only toggle log.
    pub event_log: Vec<LogEntry>,
    /// Identity profile and progression.
    pub identity: IdentityProfile,
    /// Selected view.
    pub active_tab: Tab,
}

/// Persistence abstraction for the whole application state.
pub trait StateRepository {
    /// Load the saved state, or `None` when nothing usable is stored.
    fn load(&self) -> Option<AppState>;
    /// Replace the saved state.
    fn save(&self, state: &AppState) -> CoreResult<()>;
}

/// In-memory repository for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<Option<AppState>>,
    saves: AtomicUsize,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that already holds `state`.
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the stored state.
    pub fn stored(&self) -> Option<AppState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateRepository for MemoryRepository {
    fn load(&self) -> Option<AppState> {
        self.stored()
    }

    fn save(&self, state: &AppState) -> CoreResult<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Source of the current local wall-clock time.
pub trait Clock {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the operating system's local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: u64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = now.checked_add_days(Days::new(days)) {
            *now = next;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}
