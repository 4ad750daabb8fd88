//! Timeslot grading CLI entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;

use timeslot_grading_cli::commands;
use timeslot_grading_cli::config::{load_grading_config, resolve_pattern_path};
use timeslot_grading_cli::session::PatternSession;

#[derive(Parser)]
#[command(
    name = "timeslot-grade",
    about = "Grade restaurant service windows against standards and learned baselines",
    version
)]
struct Cli {
    /// Path to .tgps pattern file.
    #[arg(short, long, global = true)]
    patterns: Option<String>,

    /// Path to a JSON grading config.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one restaurant-day and print the result as JSON.
    Grade {
        /// Restaurant identifier.
        #[arg(short, long)]
        restaurant: String,

        /// Business date (YYYY-MM-DD).
        #[arg(short, long)]
        date: String,

        /// JSON array of categorized fulfillment events.
        #[arg(short, long)]
        events: PathBuf,

        /// Learn from the day after grading and save the pattern file.
        #[arg(long)]
        write_back: bool,
    },

    /// Learn from a day without grading it.
    Observe {
        /// Restaurant identifier.
        #[arg(short, long)]
        restaurant: String,

        /// Business date (YYYY-MM-DD).
        #[arg(short, long)]
        date: String,

        /// JSON array of categorized fulfillment events.
        #[arg(short, long)]
        events: PathBuf,

        /// JSON labor figures for the same day.
        #[arg(long)]
        labor: Option<PathBuf>,
    },

    /// Grade a day's labor cost.
    Labor {
        /// Restaurant identifier.
        #[arg(short, long)]
        restaurant: String,

        /// Business date (YYYY-MM-DD).
        #[arg(short, long)]
        date: String,

        /// JSON labor figures.
        #[arg(long)]
        labor: PathBuf,
    },

    /// List learned patterns.
    Inspect {
        /// Only show patterns for this restaurant.
        #[arg(short, long)]
        restaurant: Option<String>,
    },

    /// Validate a .tgps pattern file.
    Validate,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   timeslot-grade completions bash > ~/.local/share/bash-completion/completions/timeslot-grade
    ///   timeslot-grade completions zsh > ~/.zfunc/_timeslot-grade
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_grading_config(cli.config.as_deref())?;
    let pattern_path = resolve_pattern_path(cli.patterns.as_deref());

    match cli.command {
        Commands::Grade {
            restaurant,
            date,
            events,
            write_back,
        } => {
            let events = commands::load_events(&events)?;
            let mut session = PatternSession::open(&pattern_path, config.learning)?;
            let report =
                commands::grade(&mut session, &config, &restaurant, &date, &events, write_back)?;
            session.save()?;
            print_json(&report)?;
        }

        Commands::Observe {
            restaurant,
            date,
            events,
            labor,
        } => {
            let events = commands::load_events(&events)?;
            let labor = labor.as_deref().map(commands::load_labor).transpose()?;
            let mut session = PatternSession::open(&pattern_path, config.learning)?;
            let report = commands::observe(
                &mut session,
                &config,
                &restaurant,
                &date,
                &events,
                labor.as_ref(),
            )?;
            session.save()?;
            print_json(&report)?;
        }

        Commands::Labor {
            restaurant,
            date,
            labor,
        } => {
            let figures = commands::load_labor(&labor)?;
            let session = PatternSession::open(&pattern_path, config.learning)?;
            let health = commands::labor(&session, &config, &restaurant, &date, &figures)?;
            print_json(&health)?;
        }

        Commands::Inspect { restaurant } => {
            let session = PatternSession::open(&pattern_path, config.learning)?;
            let summaries = commands::inspect(&session, &config, restaurant.as_deref())?;
            print_json(&summaries)?;
        }

        Commands::Validate => {
            match timeslot_grading::TgpsReader::read_from_file(std::path::Path::new(&pattern_path)) {
                Ok(snapshot) => {
                    println!("Valid pattern file: {pattern_path}");
                    println!("  Patterns: {}", snapshot.count());
                    println!("  Created: {}", snapshot.created_at);
                    println!("  Updated: {}", snapshot.updated_at);
                }
                Err(e) => {
                    eprintln!("Invalid pattern file: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "timeslot-grade", &mut std::io::stdout());
        }
    }

    Ok(())
}
