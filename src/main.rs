use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studynotes::ai::{AiBackend, GithubModelsClient};
use studynotes::api::{self, AppState};
use studynotes::db::Database;

#[derive(Parser)]
#[command(name = "studynotes")]
#[command(about = "Note-taking backend with AI extraction, translation, and quiz generation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for the HTTP API
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "studynotes=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the AI client from the environment. A missing credential is not
/// fatal: the server still serves, and the AI routes answer with a
/// structured misconfiguration error.
fn build_ai_backend() -> Option<Arc<dyn AiBackend>> {
    match GithubModelsClient::from_env() {
        Ok(client) => {
            tracing::info!("AI client configured for {}", client.config().endpoint);
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("AI features unavailable: {}", e);
            None
        }
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let db = Database::open_from_env()?;
    db.migrate()?;

    let ai = build_ai_backend();
    let app = api::create_router(AppState::new(db, ai));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("studynotes server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await,
        None => serve(5000).await,
    }
}
