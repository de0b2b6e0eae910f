//! RagDesk: salary and insurance question desk with per-domain RAG agents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use ragdesk_core::RagDeskConfig;
use ragdesk_server::{build_router, load_knowledge, resolve_generator, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("RAGDESK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

/// Config, embedder, knowledge indices and LLM provider, in that order.
///
/// An index that cannot be built is fatal; a missing LLM key is not.
fn init_state(data_dir: &Path) -> anyhow::Result<AppState> {
    info!("Data directory: {}", data_dir.display());

    let config = RagDeskConfig::from_env(data_dir)?;
    let embedder = ragdesk_infer::create_embedder(
        config.embedder,
        &config.data_paths.model_dir,
        config.embedding_dim,
    );
    let knowledge =
        load_knowledge(&config, &embedder).context("Failed to build knowledge indices")?;
    let generator = resolve_generator(&config);

    Ok(AppState::new(config, embedder, knowledge, generator))
}

async fn ask(question: &str) -> anyhow::Result<()> {
    let state = init_state(&resolve_data_dir())?;
    let response = state.coordinator.respond(question).await?;

    println!("{}", state.coordinator.status());
    println!();
    println!("{}", response.answer);
    println!();
    println!("Agent: {}", response.domain);
    if !response.sources.is_empty() {
        let sources: Vec<&str> = response.sources.iter().map(String::as_str).collect();
        println!("Sources: {}", sources.join(", "));
    }
    for snippet in &response.retrieved_snippets {
        println!("---");
        println!("{}", snippet.trim());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "ask" => {
                if args.len() < 3 {
                    eprintln!("Usage: ragdesk ask <question...>");
                    std::process::exit(1);
                }
                return ask(&args[2..].join(" ")).await;
            }
            "--help" | "-h" | "help" => {
                println!("RagDesk: salary and insurance question desk");
                println!();
                println!("Usage: ragdesk [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  ask <question...>        Answer one question and exit");
                println!("  help                     Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'ragdesk help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let state = Arc::new(init_state(&resolve_data_dir())?);
    let port = state.config.port;

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("RagDesk server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
