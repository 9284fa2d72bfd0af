use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Days;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use mo_core::{CoreError, DayRecord, Engine, IdentityList, IdentityPatch, LogStatus, SystemClock, Tab, TaskKind};
use mo_focus::{FocusEvent, FocusTimer};
use mo_fs::{load_config, resolve_data_path, set_config_path, FsStore};
use mo_utils::logging::{init_logging, DEFAULT_LOG_LEVEL};

type AppEngine = Engine<FsStore, SystemClock>;

#[derive(Parser)]
#[command(name = "mo", version, about = "MasteryOS habit and identity tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the data directory.
    Init {
        /// Optional path to keep data in.
        #[arg(long)]
        path: Option<String>,
    },
    /// Show today's tasks and vitals.
    Today,
    /// Check or uncheck a task by id.
    Toggle { task: String },
    /// Set the value of a scale or numeric task.
    Value {
        task: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Add (or with a negative number, remove) litres of water.
    Water {
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
    /// Log deep-work minutes without running the timer.
    DeepWork {
        #[arg(long, default_value_t = mo_core::FOCUS_SESSION_MINUTES)]
        minutes: u32,
    },
    /// Record today's bedtime; omit the time to clear it.
    Sleep { time: Option<String> },
    /// Run a 25-minute focus session. Ctrl-C cancels it.
    Focus,
    /// Print the current streak.
    Streak,
    /// Inspect or edit the identity profile.
    Identity {
        #[command(subcommand)]
        command: Option<IdentityCommand>,
    },
    /// Select the tab the terminal UI opens on.
    Tab {
        #[arg(value_enum)]
        tab: TabArg,
    },
    /// Summarize recent days.
    History {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Export the activity log as CSV.
    Export {
        /// Directory to write into; defaults to the data directory's exports folder.
        #[arg(long)]
        dir: Option<String>,
    },
    /// Erase all history, the activity log, and identity edits.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum IdentityCommand {
    /// Print the profile.
    Show,
    /// Replace the vision statement.
    Vision { text: String },
    /// Append an item to a list (values, non-negotiables, anti-identity).
    Add { list: IdentityList, item: String },
    /// Remove an item by its 1-based position.
    Remove { list: IdentityList, position: usize },
}

#[derive(Clone, ValueEnum)]
enum TabArg {
    Dashboard,
    Focus,
    Identity,
}

impl From<TabArg> for Tab {
    fn from(value: TabArg) -> Self {
        match value {
            TabArg::Dashboard => Tab::Dashboard,
            TabArg::Focus => Tab::Focus,
            TabArg::Identity => Tab::Identity,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(c) => c,
        None => return open_tui(),
    };

    if let Command::Init { path } = &command {
        let path = match path {
            Some(path) => PathBuf::from(path),
            None => FsStore::default_path()?,
        };
        let store = FsStore::new(path.clone());
        store.init().context("failed to initialize data directory")?;
        set_config_path(&path)?;
        println!("Data directory initialized at {}", path.display());
        return Ok(());
    }

    let store = FsStore::new(resolve_data_path()?);
    if !store.exists() {
        return Err(anyhow!(
            "MasteryOS is not initialized. Run `mo init` to get started."
        ));
    }
    start_logging(&store);
    let mut engine = Engine::open(store, SystemClock);

    match command {
        Command::Today => show_today(&engine),
        Command::Toggle { task } => toggle(&mut engine, &task),
        Command::Value { task, value } => set_value(&mut engine, &task, value),
        Command::Water { delta } => water(&mut engine, delta),
        Command::DeepWork { minutes } => deep_work(&mut engine, minutes),
        Command::Sleep { time } => sleep(&mut engine, time),
        Command::Focus => focus(&mut engine),
        Command::Streak => {
            println!("{} day streak", engine.streak());
            Ok(())
        }
        Command::Identity { command } => {
            identity(&mut engine, command.unwrap_or(IdentityCommand::Show))
        }
        Command::Tab { tab } => {
            engine.set_tab(tab.into()).context("failed to save tab")?;
            Ok(())
        }
        Command::History { days } => history(&engine, days),
        Command::Export { dir } => export(&engine, dir.as_deref().map(Path::new)),
        Command::Reset { yes } => reset(&mut engine, yes),
        Command::Init { .. } => unreachable!("handled above"),
    }
}

fn open_tui() -> Result<()> {
    let store = FsStore::new(resolve_data_path()?);
    if !store.exists() {
        store.init().context("failed to initialize data directory")?;
    }
    start_logging(&store);
    mo_tui::run(store)
}

/// Start file logging under the data directory; failures only warn.
fn start_logging(store: &FsStore) {
    let level = load_config()
        .ok()
        .and_then(|config| config.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    if let Err(err) = init_logging(&level, &store.logs_dir()) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn show_today(engine: &AppEngine) -> Result<()> {
    let day = engine.current_day();
    let identity = engine.identity();
    println!(
        "{}\tLevel {}\t{} XP\t{} day streak\t{}% done",
        day.date,
        identity.level(),
        identity.xp(),
        engine.streak(),
        day.completion_percent()
    );
    for task in &day.tasks {
        let mark = if task.completed { "x" } else { " " };
        let value = match (task.kind, task.value, task.target) {
            (TaskKind::Boolean, _, _) | (_, None, _) => String::new(),
            (_, Some(value), Some(target)) => format!(" {value}/{target}"),
            (_, Some(value), None) => format!(" {value}"),
        };
        println!(
            "[{mark}] {}\t{}{value}\t{}",
            task.id, task.label, task.category
        );
    }
    print_vitals(&day);
    Ok(())
}

fn print_vitals(day: &DayRecord) {
    let sleep = day.sleep_time.as_deref().unwrap_or("-");
    println!(
        "water {:.2} L\tdeep work {} min\tsleep {sleep}",
        day.water_intake, day.deep_work_minutes
    );
}

fn toggle(engine: &mut AppEngine, task: &str) -> Result<()> {
    let status = engine.toggle_task(task).context("failed to toggle task")?;
    let identity = engine.identity();
    let verb = match status {
        LogStatus::Completed => "completed",
        LogStatus::Uncompleted => "reopened",
    };
    println!(
        "{task} {verb}\tLevel {}\t{} XP",
        identity.level(),
        identity.xp()
    );
    Ok(())
}

fn set_value(engine: &mut AppEngine, task: &str, value: f64) -> Result<()> {
    engine
        .set_task_value(task, value)
        .context("failed to set task value")?;
    if let Some(task) = engine.current_day().task(task) {
        println!("{}\t{}", task.id, task.value.unwrap_or_default());
    }
    Ok(())
}

fn water(engine: &mut AppEngine, delta: f64) -> Result<()> {
    engine.adjust_water(delta).context("failed to update water")?;
    println!("water {:.2} L", engine.current_day().water_intake);
    Ok(())
}

fn deep_work(engine: &mut AppEngine, minutes: u32) -> Result<()> {
    engine
        .add_deep_work_minutes(minutes)
        .context("failed to log deep work")?;
    println!("deep work {} min", engine.current_day().deep_work_minutes);
    Ok(())
}

fn sleep(engine: &mut AppEngine, time: Option<String>) -> Result<()> {
    engine
        .set_sleep_time(time)
        .context("failed to record sleep time")?;
    print_vitals(&engine.current_day());
    Ok(())
}

fn focus(engine: &mut AppEngine) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize runtime")?;
    let (mut timer, mut events) = FocusTimer::new(runtime.handle().clone());
    timer.start();
    info!("event=focus_session status=started");

    let completed = runtime.block_on(async {
        let mut stdout = std::io::stdout();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(FocusEvent::Tick { remaining }) => {
                        print!("\r{}  ", mo_focus::format_clock(remaining));
                        stdout.flush().ok();
                    }
                    Some(FocusEvent::Completed) => break true,
                    None => break false,
                },
                _ = tokio::signal::ctrl_c() => {
                    timer.reset();
                    break false;
                }
            }
        }
    });
    println!();

    if completed {
        engine
            .record_focus_session()
            .context("failed to record focus session")?;
        println!(
            "Focus session complete. Deep work today: {} min",
            engine.current_day().deep_work_minutes
        );
    } else {
        info!("event=focus_session status=cancelled");
        println!("Focus session cancelled.");
    }
    Ok(())
}

fn identity(engine: &mut AppEngine, command: IdentityCommand) -> Result<()> {
    match command {
        IdentityCommand::Show => {
            let identity = engine.identity();
            println!("{}", identity.vision);
            println!(
                "Level {}\t{} XP\t{}/{} to next level",
                identity.level(),
                identity.xp(),
                identity.xp_into_level(),
                mo_core::XP_PER_LEVEL
            );
            for list in IdentityList::ALL {
                println!("\n{}", list.title());
                for (position, item) in identity.list(list).iter().enumerate() {
                    println!("  {}. {item}", position + 1);
                }
            }
            Ok(())
        }
        IdentityCommand::Vision { text } => engine
            .update_identity(IdentityPatch::vision(text))
            .context("failed to update vision"),
        IdentityCommand::Add { list, item } => {
            if item.trim().is_empty() {
                bail!("item cannot be empty");
            }
            let items = engine.identity().with_item_added(list, &item);
            engine
                .update_identity(IdentityPatch::list(list, items))
                .context("failed to update identity")
        }
        IdentityCommand::Remove { list, position } => {
            let len = engine.identity().list(list).len();
            if position == 0 || position > len {
                bail!("position must be between 1 and {len}");
            }
            let items = engine.identity().with_item_removed(list, position - 1);
            engine
                .update_identity(IdentityPatch::list(list, items))
                .context("failed to update identity")
        }
    }
}

fn history(engine: &AppEngine, days: u32) -> Result<()> {
    let today = engine.today();
    for offset in 0..days {
        let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        match engine.day(date) {
            Some(day) => println!(
                "{date}\t{}/{} tasks\t{:.2} L\t{} min",
                day.completed_count(),
                day.tasks.len(),
                day.water_intake,
                day.deep_work_minutes
            ),
            None => println!("{date}\t-"),
        }
    }
    Ok(())
}

fn export(engine: &AppEngine, dir: Option<&Path>) -> Result<()> {
    let payload = match engine.export() {
        Ok(payload) => payload,
        Err(CoreError::EmptyLog) => {
            eprintln!("{}", CoreError::EmptyLog);
            return Ok(());
        }
        Err(err) => return Err(err).context("failed to export log"),
    };
    let path = engine
        .repository()
        .write_export(dir, &payload)
        .context("failed to write export")?;
    println!("Exported {} rows to {}", payload.rows, path.display());
    Ok(())
}

fn reset(engine: &mut AppEngine, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to reset without --yes");
    }
    engine.reset().context("failed to reset state")?;
    println!("All progress erased.");
    Ok(())
}
