mod config;
mod db;
mod error;
mod feedback;
mod llm;
mod models;
mod prompts;
mod session;
mod weakness;

use clap::{Parser, Subcommand};
use std::io;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::Database;
use error::{Result, TutorError};
use llm::OpenAiClient;
use models::JsonOutput;
use session::{Tutor, TutorOptions, DEFAULT_USER};
use weakness::WeaknessTracker;

const DEFAULT_HISTORY_ROWS: usize = 10;

#[derive(Parser)]
#[command(name = "eisaku")]
#[command(about = "An English-writing tutor that grades your translations and drills your weak spots")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one translation question (the default)
    Practice {
        /// Skip the history summary request
        #[arg(long)]
        no_summary: bool,
    },

    /// Initialize the database
    Init,

    /// List recorded weaknesses, most frequent first
    Weaknesses,

    /// Show recently graded questions
    History {
        /// Number of questions to show
        #[arg(long, short, default_value_t = DEFAULT_HISTORY_ROWS)]
        limit: usize,
    },

    /// Show learning statistics
    Stats,
}

fn init_tracing() {
    // stdout belongs to the tutor dialogue and JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "aborting");
        match error_envelope(&e) {
            Ok(envelope) if json => println!("{}", envelope),
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

fn error_envelope(e: &TutorError) -> serde_json::Result<String> {
    serde_json::to_string(&JsonOutput::<()>::err(e.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load();
    let command = cli.command.unwrap_or(Commands::Practice { no_summary: false });

    if matches!(command, Commands::Practice { .. }) {
        config.require_api_key()?;
    }

    let db = Database::open(&config.db_path)?;
    db.init()?;
    tracing::debug!(path = %config.db_path.display(), "database ready");

    execute(command, cli.json, &config, &db)?;
    db.close()?;
    Ok(())
}

fn execute(command: Commands, json: bool, config: &Config, db: &Database) -> Result<()> {
    match command {
        Commands::Practice { no_summary } => {
            let client = OpenAiClient::new(
                config.require_api_key()?,
                &config.base_url,
                &config.model,
            );
            tracing::info!(model = client.model(), "completion client ready");

            let options = TutorOptions {
                summarize_history: !no_summary,
                ..TutorOptions::default()
            };
            let tutor = Tutor::new(db, &client, options);
            let mut input = io::stdin().lock();

            if json {
                // Keep stdout for the JSON envelope.
                let report = tutor.run_turn(&mut input, &mut io::stderr())?;
                println!("{}", serde_json::to_string(&JsonOutput::ok(&report))?);
            } else {
                tutor.run_turn(&mut input, &mut io::stdout().lock())?;
            }
        }

        Commands::Init => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(init_data(&config.db_path)))?
                );
            } else {
                println!("Database initialized at: {}", config.db_path.display());
            }
        }

        Commands::Weaknesses => {
            let user = db.get_or_create_user(DEFAULT_USER)?;
            let weaknesses = db.list_weaknesses(user.id, None)?;
            if json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&weaknesses))?);
            } else if weaknesses.is_empty() {
                println!("No weaknesses recorded yet.");
            } else {
                let focus = WeaknessTracker::new(db).focus(user.id)?;
                println!("Current focus: {}", focus);
                println!();
                println!("{:<20} {:>6}  LAST OCCURRED", "CATEGORY", "COUNT");
                println!("{}", "-".repeat(60));
                for w in weaknesses {
                    println!(
                        "{:<20} {:>6}  {}",
                        truncate(&w.category, 18),
                        w.frequency,
                        w.last_occurred
                    );
                }
            }
        }

        Commands::History { limit } => {
            let user = db.get_or_create_user(DEFAULT_USER)?;
            let questions = db.recent_questions(user.id, limit)?;
            if json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&questions))?);
            } else if questions.is_empty() {
                println!("No questions answered yet.");
            } else {
                println!("{:<5} {:<11} {:<10} QUESTION", "ID", "DATE", "ERROR");
                println!("{}", "-".repeat(70));
                for q in questions {
                    println!(
                        "{:<5} {:<11} {:<10} {}",
                        q.id,
                        q.created_day(),
                        q.verdict.label(),
                        truncate(&q.question_text, 40)
                    );
                    println!("{:<28} you:      {}", "", q.user_answer);
                    if !q.expected_ans.is_empty() {
                        println!("{:<28} expected: {}", "", q.expected_ans);
                    }
                }
            }
        }

        Commands::Stats => {
            let user = db.get_or_create_user(DEFAULT_USER)?;
            let stats = db.get_stats(user.id)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "total_sessions": stats.total_sessions,
                        "total_questions": stats.total_questions,
                        "correct": stats.correct,
                        "accuracy": stats.accuracy(),
                        "weakness_categories": stats.weakness_categories
                    })))?
                );
            } else {
                println!("=== Learning Statistics ===");
                println!("Sessions: {}", stats.total_sessions);
                println!("Questions answered: {}", stats.total_questions);
                println!("Correct: {} ({:.0}%)", stats.correct, stats.accuracy());
                println!("Weakness categories: {}", stats.weakness_categories);
            }
        }
    }

    Ok(())
}

fn init_data(db_path: &Path) -> serde_json::Value {
    serde_json::json!({ "db_path": db_path.display().to_string() })
}

// Counts characters, not bytes, so Japanese text is never split mid-char.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
