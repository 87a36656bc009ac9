use anyhow::Result;
use clap::{Parser, Subcommand};
use hypnos_core::{HypnosConfig, LexiconAnalyzer, UserAction};
use hypnos_learning::{
    AdapterRegistry, AssistantCoordinator, FeedbackCapture, SqliteStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Operator CLI for the Hypnos consolidation engine")]
struct Args {
    /// Path to the feedback database
    #[arg(short, long, default_value = "hypnos.db", env = "HYPNOS_DB")]
    db: String,

    /// Path to the TOML config file
    #[arg(short, long, default_value = "hypnos.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one user reaction and store its scored feedback
    Feedback {
        /// The original query/prompt
        query: String,
        /// The generated response
        response: String,
        /// Free-text user reaction
        #[arg(default_value = "")]
        reaction: String,
        /// User action: accept, edit, delete, or ignore
        #[arg(long)]
        action: Option<String>,
        /// Normalized edit distance in [0, 1]
        #[arg(long)]
        edit_distance: Option<f32>,
        /// Explicit rating in [-1, 1]; replaces the inferred sentiment
        #[arg(long)]
        explicit_score: Option<f32>,
        /// Domain context (e.g. file type or framework)
        #[arg(long)]
        context: Option<String>,
    },
    /// Run sleep consolidation
    Sleep {
        /// Bypass the activity gate
        #[arg(long)]
        force: bool,
    },
    /// Show the sleep gate status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = HypnosConfig::load_or_default(&args.config);

    info!("opening store at {}", args.db);
    let store = Arc::new(SqliteStore::new(&args.db).await?);
    let backend = Arc::new(AdapterRegistry::new(config.training.clone()));
    let coordinator = AssistantCoordinator::with_analyzer(
        &config,
        store,
        backend,
        Arc::new(LexiconAnalyzer),
    );

    match args.command {
        Command::Feedback {
            query,
            response,
            reaction,
            action,
            edit_distance,
            explicit_score,
            context,
        } => {
            let action = action.as_deref().map(str::parse::<UserAction>).transpose()?;
            let id = coordinator
                .capture_feedback(FeedbackCapture {
                    query,
                    response,
                    reaction,
                    suggestion_id: None,
                    action,
                    edit_distance,
                    explicit_score,
                    context,
                })
                .await?;
            println!("stored feedback {id}");
        }
        Command::Sleep { force } => {
            let run = coordinator.trigger_sleep(force).await;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Command::Status => {
            let status = coordinator.sleep_status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
