// src/main.rs

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use luna::api::http_router;
use luna::chat::{ChatRequest, StreamEvent};
use luna::rag::SyncEvent;
use luna::{AppState, LunaConfig};

#[derive(Parser)]
#[command(name = "luna")]
#[command(about = "Writing assistant backend with vault retrieval and tool calling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Rebuild the vault index, printing progress as NDJSON
    Sync {
        /// Vault root (default: VAULT_PATH)
        #[arg(short, long)]
        vault: Option<PathBuf>,
    },

    /// Search the vault index
    Search {
        query: String,

        /// Neighbours per collection
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Ask a single question, printing events as NDJSON (Ctrl-C stops)
    Chat {
        prompt: String,

        /// Do not offer tools to the model
        #[arg(long)]
        no_tools: bool,

        /// Prepend matching vault notes
        #[arg(long)]
        augment: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = LunaConfig::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = AppState::from_config(config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state).await,
        Commands::Sync { vault } => sync(state, vault).await,
        Commands::Search { query, top_k } => {
            let top_k = top_k.unwrap_or(state.config.search_top_k);
            let notes = state.retrieval.search(&query, top_k).await;
            println!("{}", serde_json::to_string_pretty(&notes)?);
            Ok(())
        }
        Commands::Chat {
            prompt,
            no_tools,
            augment,
        } => {
            let request = ChatRequest {
                tools: !no_tools,
                augment,
                ..ChatRequest::new(prompt)
            };
            chat(state, request).await
        }
    }
}

async fn serve(state: AppState) -> Result<()> {
    let bind_address = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    let active = state.active.clone();
    let app = http_router(state);

    info!("Luna backend listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down, cancelling {} active chat(s)", active.cancel_all());
        })
        .await?;
    Ok(())
}

async fn sync(state: AppState, vault: Option<PathBuf>) -> Result<()> {
    let Some(root) = vault.or_else(|| state.config.vault_path.clone()) else {
        bail!("No vault given: pass --vault or set VAULT_PATH");
    };

    let events = state.ingestion.sync(root);
    tokio::pin!(events);

    let mut stdout = std::io::stdout();
    let mut failed = false;
    while let Some(event) = events.next().await {
        if matches!(event, SyncEvent::Error { file: None, .. }) {
            failed = true;
        }
        writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
    }

    if failed {
        bail!("Vault sync failed");
    }
    Ok(())
}

async fn chat(state: AppState, request: ChatRequest) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping generation");
            ctrl_c.cancel();
        }
    });

    let events = state.orchestrator.run(request, cancel);
    tokio::pin!(events);

    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        stdout.write_all(event.to_ndjson().as_bytes())?;
        stdout.flush()?;
        if let StreamEvent::Error { content } = &event {
            bail!("Chat failed: {content}");
        }
    }
    Ok(())
}
