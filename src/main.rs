//! Routinely command-line interface.
//!
//! Reads and writes the routine database and prints results as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use routinely::routines::types::DayOfWeek;
use routinely::storage::config::{self, AppConfig};
use routinely::storage::SessionRoutine;
use routinely::{
    ItemSelector, ProgressSubject, RoutineDefinition, RoutineService, SleepRoutine, TimeOfDay,
};

#[derive(Parser)]
#[command(name = "routinely", version, about = "Routine lifecycle and weekly completion")]
struct Cli {
    /// Database file (defaults to the one in the data directory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (defaults to config.toml in the data directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file.
    Init,

    /// Create or replace the owner's draft routine document.
    Draft {
        #[arg(long)]
        owner: String,
        /// Document text.
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read the document text from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Promote the owner's draft to the active routine.
    Activate {
        #[arg(long)]
        owner: String,
    },

    /// Show the owner's active and draft documents, or one document by ID.
    Show {
        #[arg(long, required_unless_present = "id")]
        owner: Option<String>,
        #[arg(long)]
        id: Option<Uuid>,
    },

    /// List the owner's documents, newest version first.
    History {
        #[arg(long)]
        owner: String,
        /// Maximum number of documents (defaults to the configured limit).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Soft-delete one of the owner's documents.
    DeleteDoc {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: Uuid,
    },

    /// Merge routine definitions (owner) or session routines (session) from a JSON file.
    Import {
        #[command(flatten)]
        subject: SubjectArgs,
        /// JSON array to merge.
        file: PathBuf,
    },

    /// Show weekly completion.
    Progress {
        #[command(flatten)]
        subject: SubjectArgs,
        /// Any date in the week to evaluate (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove an item from one day and slot.
    DeleteItem {
        #[command(flatten)]
        subject: SubjectArgs,
        /// Day of the week (name, abbreviation or 0-6 from Sunday).
        #[arg(long)]
        day: DayOfWeek,
        /// morning, midday, night or workout.
        #[arg(long)]
        slot: TimeOfDay,
        /// Item name (case-insensitive).
        #[arg(long)]
        item: String,
    },

    /// Show or update the sleep routine.
    Sleep {
        #[command(flatten)]
        subject: SubjectArgs,
        /// Bedtime, HH:MM.
        #[arg(long, value_parser = parse_time)]
        bedtime: Option<NaiveTime>,
        /// Wake time, HH:MM.
        #[arg(long, value_parser = parse_time)]
        wake: Option<NaiveTime>,
        /// Pre-bed item; repeat for several, in order.
        #[arg(long = "item")]
        items: Vec<String>,
    },

    /// Show onboarding status.
    Onboarding {
        #[command(flatten)]
        subject: SubjectArgs,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SubjectArgs {
    /// Registered owner ID.
    #[arg(long)]
    owner: Option<String>,
    /// Unregistered session ID.
    #[arg(long)]
    session: Option<String>,
}

impl SubjectArgs {
    fn subject(self) -> Result<ProgressSubject> {
        match (self.owner, self.session) {
            (Some(owner), None) => Ok(ProgressSubject::Owner(owner)),
            (None, Some(session)) => Ok(ProgressSubject::Session(session)),
            _ => bail!("pass exactly one of --owner or --session"),
        }
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => config::load_config().context("loading configuration")?,
    };

    if let Some(db) = &cli.db {
        let file_name = db
            .file_name()
            .with_context(|| format!("{} is not a file path", db.display()))?;
        config.data_dir = db.parent().map(PathBuf::from).unwrap_or_default();
        config.database.file_name = file_name.to_string_lossy().into_owned();
    }

    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let service = RoutineService::open(&config)
        .with_context(|| format!("opening {}", config.database_path().display()))?;

    match cli.command {
        Commands::Init => {
            let path = cli.config.clone().unwrap_or_else(config::get_config_path);
            config::save_config_to(&config, &path)
                .with_context(|| format!("writing {}", path.display()))?;
            print_json(&serde_json::json!({
                "config": path,
                "database": config.database_path(),
            }))
        }

        Commands::Draft {
            owner,
            content,
            file,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                (None, None) => bail!("pass --content or --file"),
            };
            print_json(&service.create_or_replace_draft(&owner, &content)?)
        }

        Commands::Activate { owner } => print_json(&service.activate_draft(&owner)?),

        Commands::Show { owner, id } => match (id, owner) {
            (Some(id), _) => print_json(&service.get_document(id)?),
            (None, Some(owner)) => print_json(&serde_json::json!({
                "active": service.get_active_document(&owner)?,
                "draft": service.get_draft_document(&owner)?,
            })),
            (None, None) => bail!("pass --owner or --id"),
        },

        Commands::History { owner, limit } => print_json(&service.history(&owner, limit)?),

        Commands::DeleteDoc { owner, id } => {
            service.delete_document(&owner, id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }

        Commands::Import { subject, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = match subject.subject()? {
                ProgressSubject::Owner(owner) => {
                    let definitions: Vec<RoutineDefinition> = serde_json::from_str(&raw)
                        .with_context(|| format!("parsing {}", file.display()))?;
                    service.upsert_definitions(&owner, &definitions)?
                }
                ProgressSubject::Session(session) => {
                    let routines: Vec<SessionRoutine> = serde_json::from_str(&raw)
                        .with_context(|| format!("parsing {}", file.display()))?;
                    service.upsert_session_routines(&session, &routines)?
                }
            };
            print_json(&summary)
        }

        Commands::Progress { subject, date } => {
            print_json(&service.weekly_progress(&subject.subject()?, date)?)
        }

        Commands::DeleteItem {
            subject,
            day,
            slot,
            item,
        } => {
            let selector = ItemSelector::new(day, slot, item);
            service.delete_item(&subject.subject()?, &selector)?;
            print_json(&selector)
        }

        Commands::Sleep {
            subject,
            bedtime,
            wake,
            items,
        } => {
            let subject = subject.subject()?;
            if bedtime.is_some() || wake.is_some() || !items.is_empty() {
                let mut routine = service.get_sleep_routine(&subject)?.unwrap_or_default();
                routine.bedtime = bedtime.or(routine.bedtime);
                routine.wake_time = wake.or(routine.wake_time);
                if !items.is_empty() {
                    routine.pre_bed_items = items;
                }
                service.set_sleep_routine(&subject, &routine)?;
            }

            let routine: SleepRoutine = service.get_sleep_routine(&subject)?.unwrap_or_default();
            print_json(&serde_json::json!({
                "routine": routine,
                "progress": service.sleep_progress(&subject)?,
            }))
        }

        Commands::Onboarding { subject, date } => {
            print_json(&service.onboarding_status(&subject.subject()?, date)?)
        }
    }
}
