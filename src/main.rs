use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing_subscriber::EnvFilter;

use pinfeed::api::create_router;
use pinfeed::config::CONFIG;
use pinfeed::state::AppState;

#[derive(Parser)]
#[command(name = "pinfeed", about = "Recipe feed, search and assistant service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Keep everything in memory instead of MongoDB.
        #[arg(long)]
        memory: bool,
        /// Address to listen on; defaults to BIND_ADDR.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Query the search index once and print the best matches.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        number: usize,
        #[arg(long)]
        memory: bool,
    },
}

fn init_logging() -> anyhow::Result<()> {
    // Bridge log crate -> tracing (so log::info! etc. work)
    tracing_log::LogTracer::init().context("failed to install log bridge")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { memory, bind } => {
            let state = Arc::new(AppState::from_config(memory).await?);
            state.spawn_session_sweeper();
            let addr = bind.unwrap_or_else(|| CONFIG.bind_addr.clone());
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            log::info!("listening on {addr}");

            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
            log::info!("server shut down");
        }
        Command::Search {
            query,
            number,
            memory,
        } => {
            let state = AppState::from_config(memory).await?;
            let records = state.engine.top_records(&query, number);
            if records.is_empty() {
                println!("no recipes match {query:?}");
            }
            for (i, record) in records.iter().enumerate() {
                println!(
                    "{}. {} [{}] ({:.2})",
                    i + 1,
                    record.title,
                    record.id.as_deref().unwrap_or("-"),
                    record.relevance_score.unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
