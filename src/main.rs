//! `aeryth` command-line entry point.
//!
//! Reads and writes Document fields through the persistence manager, plans
//! routine reminders and records notification responses.

use std::path::PathBuf;
use std::sync::Arc;

use aeryth::assistant::Assistant;
use aeryth::model::{Routine, Settings};
use aeryth::reminders::{
    alarm_name, next_occurrence, record_response, AlarmEdge, NotificationAction,
    ReminderScheduler, TokioAlarmSink,
};
use aeryth::storage::cloud::CloudSession;
use aeryth::storage::settings::load_settings;
use aeryth::storage::{fields, PersistenceManager};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "aeryth", version, about = "Aeryth personal assistant storage tool")]
struct Cli {
    /// Override the data directory (handles.json, local_storage.json)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Cloud user id; enables the cloud backend when a base URL is configured
    #[arg(long, global = true)]
    user: Option<String>,

    /// Bearer token for the cloud backend
    #[arg(long, global = true, default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EdgeArg {
    Start,
    End,
}

impl From<EdgeArg> for AlarmEdge {
    fn from(edge: EdgeArg) -> Self {
        match edge {
            EdgeArg::Start => AlarmEdge::Start,
            EdgeArg::End => AlarmEdge::End,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a field as JSON
    Get {
        field: String,
        /// JSON printed when the field is absent
        #[arg(long, default_value = "null")]
        fallback: String,
    },
    /// Set a field to a JSON value
    Set { field: String, value: String },
    /// Store the Document in a directory from now on
    ChooseDir { dir: PathBuf },
    /// Show the next start/end time of every stored routine
    Plan,
    /// Record a notification response (started, skipped, completed, snooze:<min>).
    /// A snooze only lasts while this command runs.
    Respond {
        routine_id: String,
        action: String,
        #[arg(long, value_enum, default_value = "start")]
        edge: EdgeArg,
        /// Day the response applies to (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Rebuild and print the profile summary
    Summarize,
    /// Ask the assistant (offline fallback)
    Reply { text: Vec<String> },
}

fn parse_json(raw: &str) -> Value {
    // Bare words are taken as strings so `set note hello` works.
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    aeryth::logging::init_logging();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if cli.data_dir.is_some() {
        settings.data_dir = cli.data_dir.clone();
    }
    let manager = PersistenceManager::new(settings)?;
    if let Some(user) = cli.user.clone() {
        manager
            .use_cloud(CloudSession {
                user_id: user,
                token: cli.token.clone(),
            })
            .await;
    }

    let result = run(&manager, cli.command).await;
    manager.shutdown().await;
    result
}

async fn run(
    manager: &PersistenceManager,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Get { field, fallback } => {
            let value = manager.load(&field, parse_json(&fallback)).await;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Set { field, value } => {
            manager.save(&field, parse_json(&value)).await;
        }
        Command::ChooseDir { dir } => {
            manager.choose_directory(&dir).await?;
            println!("Storing data in {}", dir.display());
        }
        Command::Plan => {
            let routines: Vec<Routine> = manager.load_typed(fields::ROUTINES, Vec::new()).await;
            let now = chrono::Local::now().naive_local();
            for routine in &routines {
                for edge in [AlarmEdge::Start, AlarmEdge::End] {
                    match next_occurrence(routine, edge, now) {
                        Ok(at) => println!("{} {:?}: {}", routine.name, edge, at),
                        Err(e) => println!("{} {:?}: {}", routine.name, edge, e),
                    }
                }
            }
        }
        Command::Respond {
            routine_id,
            action,
            edge,
            date,
        } => {
            let action: NotificationAction = action.parse()?;
            let (sink, _fired) = TokioAlarmSink::new();
            let scheduler = ReminderScheduler::new(Arc::new(sink));
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let edge: AlarmEdge = edge.into();
            let status =
                record_response(manager, &scheduler, &routine_id, edge, date, action).await?;
            match status {
                Some(status) => println!("{} -> {:?}", routine_id, status),
                None => {
                    let until = scheduler
                        .armed_at(&alarm_name(&routine_id, edge))
                        .map(|at| at.with_timezone(&chrono::Local).format("%H:%M").to_string())
                        .unwrap_or_default();
                    println!("{} snoozed until {}", routine_id, until);
                    println!(
                        "Note: this reminder is not kept once the command exits; \
                         no alarm will fire."
                    );
                }
            }
        }
        Command::Summarize => {
            let summary = Assistant::offline().refresh_profile(manager).await;
            println!("{}", summary);
        }
        Command::Reply { text } => {
            let settings: Settings =
                manager.load_typed(fields::SETTINGS, Settings::default()).await;
            let reply = Assistant::offline()
                .reply(settings.aeryth_tone, &text.join(" "))
                .await;
            println!("{}", reply);
        }
    }
    Ok(())
}
