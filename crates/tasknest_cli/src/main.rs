//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tasknest_core` linkage.
//! - Exercise the task store against a real SQLite file for local checks.
//!
//! Reminder commands are printed instead of delivered; there is no platform
//! notification service on a terminal. File logging starts when
//! `TASKNEST_LOG_DIR` is set.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tasknest_core::db::open_db;
use tasknest_core::{
    AddTaskRequest, CommandQueueScheduler, CoreConfig, Priority, ReminderCommand,
    SqliteKeyValueStore, SystemClock, TaskId, TaskStore, ThemeService,
};

/// TaskNest local maintenance tool.
#[derive(Debug, Parser)]
#[command(name = "tasknest_cli", version, about)]
struct Cli {
    /// SQLite file to use instead of `TASKNEST_DB_PATH`.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Print core ping and version.
    Ping,
    /// List stored tasks.
    List,
    /// Create a task.
    Add {
        title: String,
        #[arg(value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        /// Reminder time as Unix epoch milliseconds.
        due_epoch_ms: Option<i64>,
    },
    /// Flip a task's completed flag.
    Toggle {
        #[arg(value_parser = parse_task_id)]
        task_id: TaskId,
    },
    /// Delete a task and cancel its reminder.
    Delete {
        #[arg(value_parser = parse_task_id)]
        task_id: TaskId,
    },
    /// Show the theme, or flip it with `--toggle`.
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = CoreConfig::from_env();
    if let Some(path) = cli.db {
        config.db_path = path;
    }

    if let Some(log_dir) = &config.log_dir {
        let started = tasknest_core::init_logging(&config.log_level, &log_dir.to_string_lossy());
        if let Err(err) = started {
            eprintln!("warning: file logging disabled: {err}");
        }
    }

    match run(&config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| "expected low|medium|high".to_string())
}

fn parse_task_id(value: &str) -> Result<TaskId, String> {
    TaskId::parse(value).ok_or_else(|| "task id must not be blank".to_string())
}

fn run(config: &CoreConfig, command: Command) -> Result<(), String> {
    if command == Command::Ping {
        println!("tasknest_core ping={}", tasknest_core::ping());
        println!("tasknest_core version={}", tasknest_core::core_version());
        return Ok(());
    }

    let conn = open_db(&config.db_path)
        .map_err(|err| format!("cannot open `{}`: {err}", config.db_path.display()))?;
    let kv = SqliteKeyValueStore::try_new(&conn).map_err(|err| err.to_string())?;

    if let Command::Theme { toggle } = command {
        let mut service = ThemeService::load(kv, None);
        if toggle {
            let (theme, write_error) = service.toggle();
            if let Some(err) = write_error {
                eprintln!("warning: theme not saved: {err}");
            }
            println!("theme={theme}");
        } else {
            println!("theme={}", service.current());
        }
        return Ok(());
    }

    let scheduler = CommandQueueScheduler::new();
    let mut store =
        TaskStore::load(kv, &scheduler, SystemClock).with_snooze_delay_ms(config.snooze_delay_ms);
    if store.load_failed() && command != Command::List {
        for warning in store.drain_recoverable_errors() {
            eprintln!("warning: {warning}");
        }
        return Err("stored tasks are unreadable; refusing to overwrite them".to_string());
    }

    let outcome = match command {
        Command::List => {
            for task in store.tasks() {
                let due = task
                    .due_date
                    .map_or_else(|| "-".to_string(), |due| due.to_string());
                println!(
                    "{} [{}] {} priority={} due={}",
                    task.id,
                    if task.completed { "x" } else { " " },
                    task.title,
                    task.priority.as_str(),
                    due
                );
            }
            Ok(())
        }
        Command::Add {
            title,
            priority,
            due_epoch_ms,
        } => store
            .add(AddTaskRequest {
                title,
                priority,
                due_date: due_epoch_ms,
                ..AddTaskRequest::default()
            })
            .map(|task| println!("added {}", task.id))
            .map_err(|err| err.to_string()),
        Command::Toggle { task_id } => store
            .toggle(&task_id)
            .map(|task| println!("toggled {} completed={}", task.id, task.completed))
            .map_err(|err| err.to_string()),
        Command::Delete { task_id } => store
            .delete(&task_id)
            .map(|task| println!("deleted {}", task.id))
            .map_err(|err| err.to_string()),
        Command::Ping | Command::Theme { .. } => Ok(()),
    };

    for warning in store.drain_recoverable_errors() {
        eprintln!("warning: {warning}");
    }
    for command in scheduler.drain() {
        match command {
            ReminderCommand::Schedule {
                handle, fire_at_ms, ..
            } => println!("reminder schedule handle={handle} fire_at_ms={fire_at_ms}"),
            ReminderCommand::Cancel { handle } => println!("reminder cancel handle={handle}"),
        }
    }
    outcome
}
