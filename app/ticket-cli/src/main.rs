//! Ticket insights command line
//!
//! Loads tickets from a Google Sheet (per config) or a local export and
//! prints dashboard numbers, answers questions, or runs an interactive chat.
//!
//! ```bash
//! ticket-cli --file chamados.xlsx stats
//! ticket-cli ask "quantos chamados abertos nos últimos 7 dias?"
//! GEMINI_API_KEY=... ticket-cli chat
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use ticket_insights::analytics::{
    count_by_field, distinct_assignees, monthly_average, priority_counts, recent_activity,
    status_counts,
};
use ticket_insights::{
    AnswerOrchestrator, ChatSession, DashboardStats, FileSource, GeminiProvider, GenerationConfig,
    InsightsConfig, LLMProvider, RowLayout, SheetsSource, TicketField, TicketFilter,
    TicketSource, TicketStore,
};

#[derive(Parser)]
#[command(name = "ticket-cli")]
#[command(version)]
#[command(about = "Support-ticket dashboard numbers and question answering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config dir when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Read tickets from a local .xlsx/.xls/.ods/.csv instead of Google Sheets
    #[arg(long, short, global = true)]
    file: Option<PathBuf>,

    /// Column layout of the source, overriding the config
    #[arg(long, global = true, value_enum)]
    layout: Option<LayoutArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Positional,
    Header,
}

impl From<LayoutArg> for RowLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Positional => RowLayout::Positional,
            LayoutArg::Header => RowLayout::HeaderDriven,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Overview numbers, distributions and monthly TMA/FRT averages
    Stats,

    /// Most recently updated tickets
    Recent {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// List tickets matching the given filters
    Tickets {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        /// Free-text search over title, description, requester and assignee
        #[arg(long, short)]
        query: Option<String>,
    },

    /// Answer a single question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Summary, insights and recommendations for the current tickets
    Analyze,

    /// Interactive chat on stdin
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let layout = cli.layout.map(RowLayout::from).unwrap_or(config.sheets.layout);

    let source: Arc<dyn TicketSource> = match &cli.file {
        Some(path) => Arc::new(FileSource::new(path)),
        None => Arc::new(
            SheetsSource::from_config(&config.sheets)
                .context("Google Sheets source is not configured (or pass --file)")?,
        ),
    };

    let store = Arc::new(TicketStore::new(layout));
    store
        .refresh(source.as_ref())
        .await
        .with_context(|| format!("Failed to load tickets from {}", source.describe()))?;

    match cli.command {
        Commands::Stats => print_stats(&store),
        Commands::Recent { limit } => {
            let snapshot = store.snapshot();
            let limit = limit.unwrap_or(config.recent_activity_limit);
            print_json(&recent_activity(&snapshot.records, limit))
        }
        Commands::Tickets { status, priority, assignee, query } => {
            let filter = TicketFilter { status, priority, assignee, query };
            let snapshot = store.snapshot();
            print_json(&filter.apply(&snapshot.records))
        }
        Commands::Ask { question } => {
            let orchestrator = build_orchestrator(&config).await;
            let answer = orchestrator
                .answer_question(&store.snapshot().records, &question.join(" "))
                .await;
            println!("{}", answer);
            Ok(())
        }
        Commands::Analyze => {
            let orchestrator = build_orchestrator(&config).await;
            let analysis = orchestrator.analyze(&store.snapshot().records).await;
            print_json(&analysis)
        }
        Commands::Chat => run_chat(&config, store, source).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<InsightsConfig> {
    let mut config = match path {
        Some(path) => InsightsConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let default_path = InsightsConfig::default_path();
            if default_path.exists() {
                InsightsConfig::from_file(&default_path)
                    .with_context(|| format!("Failed to load config {}", default_path.display()))?
            } else {
                InsightsConfig::default()
            }
        }
    };
    config.apply_env();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Remote provider when a key is configured; local-only otherwise.
async fn build_orchestrator(config: &InsightsConfig) -> AnswerOrchestrator {
    let generation = GenerationConfig::from(&config.llm);
    match GeminiProvider::from_settings(&config.llm).await {
        Ok(Some(provider)) => {
            tracing::info!(model = %provider.model(), "Using remote model");
            AnswerOrchestrator::new(Some(Arc::new(provider) as Arc<dyn LLMProvider>), generation)
        }
        Ok(None) => {
            tracing::info!("No LLM api key configured, answering locally");
            AnswerOrchestrator::new(None, generation)
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM provider unavailable, answering locally");
            AnswerOrchestrator::new(None, generation)
        }
    }
}

fn print_stats(store: &TicketStore) -> Result<()> {
    let snapshot = store.snapshot();
    let records = &snapshot.records;
    let report = json!({
        "version": snapshot.version,
        "fetched_at": snapshot.fetched_at,
        "overview": DashboardStats::from_records(records),
        "by_status": status_counts(records),
        "by_priority": priority_counts(records),
        "by_department": count_by_field(records, &TicketField::Department),
        "monthly_tma": monthly_average(records, &TicketField::CreatedAt, &TicketField::Tma),
        "monthly_frt": monthly_average(records, &TicketField::CreatedAt, &TicketField::Frt),
        "assignees": distinct_assignees(records),
    });
    print_json(&report)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_chat(
    config: &InsightsConfig,
    store: Arc<TicketStore>,
    source: Arc<dyn TicketSource>,
) -> Result<()> {
    let refresher = config.refresh.auto_refresh.then(|| {
        ticket_insights::storage::spawn_auto_refresh(
            store.clone(),
            source,
            Duration::from_secs(config.refresh.interval_secs),
        )
    });

    let mut session = ChatSession::new(build_orchestrator(config).await);
    if let Some(greeting) = session.history().first() {
        println!("{}\n", greeting.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if matches!(line, "sair" | "exit" | "quit") {
            break;
        }
        let snapshot = store.snapshot();
        if let Some(reply) = session.send(&snapshot.records, line).await {
            println!("{}\n", reply.text);
        }
    }

    if let Some(handle) = refresher {
        handle.abort();
    }
    Ok(())
}
