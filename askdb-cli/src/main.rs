//! askdb - ask a SQL database questions in any language.
//!
//! Configuration comes from `ASKDB_*` environment variables (a `.env` file
//! in the working directory is loaded first), with command-line flags taking
//! precedence.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use askdb_core::JsonLlm;
use askdb_llm::{CachedLlm, OpenAiCompatibleClient};
use askdb_pipeline::{PipelineConfig, PipelineMode, QueryProcessor};
use askdb_sql::{DatabaseTools, SqlDatabase, SqliteDatabase};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "askdb")]
#[command(about = "Ask a SQL database questions in any language")]
struct Args {
    /// SQLite database URL, e.g. sqlite://data/health.db
    #[arg(long, env = "ASKDB_DATABASE_URL")]
    database_url: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "ASKDB_LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// Overrides ASKDB_DB_ID
    #[arg(long)]
    db_id: Option<String>,

    /// Overrides ASKDB_LLM
    #[arg(long)]
    llm: Option<String>,

    /// Overrides ASKDB_MODE (single_turn or multi_turn)
    #[arg(long)]
    mode: Option<String>,

    /// HTTP timeout for model calls, in seconds
    #[arg(long, default_value = "120")]
    timeout_secs: u64,

    /// Send every request to the model, even repeated ones
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question and print the full pipeline result as JSON
    Ask {
        question: String,
        /// Extra JSON metadata sent along with the question
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Multi-turn conversation on stdin, one question per line
    Chat,
    /// Describe the database and suggest questions for it
    Describe {
        /// Number of suggested questions
        #[arg(long, default_value = "5")]
        questions: usize,
    },
    /// Run and grade a JSON file of evaluation cases
    Eval {
        cases: PathBuf,
        /// Model used by the grading bot
        #[arg(long, default_value = "gpt-4o")]
        grader: String,
        #[arg(long, default_value_t = askdb_eval::DEFAULT_MAX_IN_FLIGHT)]
        max_in_flight: usize,
    },
}

/// Everything a command needs, built once.
pub struct App {
    pub llm: Arc<dyn JsonLlm>,
    pub db: Arc<dyn SqlDatabase>,
    pub tools: Arc<DatabaseTools>,
    pub config: PipelineConfig,
}

impl App {
    pub fn processor(&self) -> Result<QueryProcessor> {
        QueryProcessor::new(self.llm.clone(), self.tools.clone(), self.config.clone())
            .context("invalid pipeline configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env().context("reading ASKDB_* configuration")?;
    if let Some(db_id) = args.db_id {
        config.db_id = db_id;
    }
    if let Some(llm) = args.llm {
        config.llm = llm;
    }
    if let Some(mode) = args.mode {
        config.mode = mode.parse()?;
    }
    if matches!(args.command, Command::Chat) {
        config.mode = PipelineMode::MultiTurn;
    }

    let mut client =
        OpenAiCompatibleClient::builder().timeout(Duration::from_secs(args.timeout_secs));
    if let Some(url) = &args.llm_base_url {
        client = client.base_url(url)?;
    }
    if let Some(key) = &config.api_key {
        client = client.api_key(key.expose());
    }
    let client = client.build()?;
    let llm: Arc<dyn JsonLlm> = if args.no_cache {
        Arc::new(client)
    } else {
        Arc::new(CachedLlm::new(client))
    };

    let db = SqliteDatabase::builder(&args.database_url)
        .max_connections(4)
        .build()
        .await
        .with_context(|| format!("connecting to {}", args.database_url))?;

    let app = App {
        llm,
        db: Arc::new(db),
        tools: Arc::new(DatabaseTools::default()),
        config,
    };

    match args.command {
        Command::Ask { question, metadata } => commands::ask(&app, question, metadata).await,
        Command::Chat => commands::chat(&app).await,
        Command::Describe { questions } => commands::describe(&app, questions).await,
        Command::Eval {
            cases,
            grader,
            max_in_flight,
        } => commands::eval(&app, &cases, grader, max_in_flight).await,
    }
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::Parser;

    #[test]
    fn parses_ask_with_overrides() {
        let args = Args::try_parse_from([
            "askdb",
            "--database-url",
            "sqlite::memory:",
            "--db-id",
            "health",
            "--no-cache",
            "ask",
            "How many beds are in Pune?",
        ])
        .unwrap();

        assert_eq!(args.db_id.as_deref(), Some("health"));
        assert!(args.no_cache);
        assert_eq!(args.timeout_secs, 120);
        assert!(matches!(
            args.command,
            Command::Ask { ref question, metadata: None } if question == "How many beds are in Pune?"
        ));
    }

    #[test]
    fn eval_defaults_to_twenty_cases_in_flight() {
        let args = Args::try_parse_from([
            "askdb",
            "--database-url",
            "sqlite::memory:",
            "eval",
            "cases.json",
        ])
        .unwrap();

        let Command::Eval { max_in_flight, grader, .. } = args.command else {
            panic!("expected eval");
        };
        assert_eq!(max_in_flight, 20);
        assert_eq!(grader, "gpt-4o");
    }
}
