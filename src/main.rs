//! # Tech News Blogger
//!
//! Turns today's technology news into a blog post: candidate stories come
//! from a news search feed, a local LLM (served by Ollama) picks the most
//! promising one and writes a Markdown post about it.
//!
//! ## Usage
//!
//! ```sh
//! # One post, then exit
//! tech_news_blogger run
//!
//! # Scheduler with an HTTP control surface on :5000
//! tech_news_blogger serve
//! ```
//!
//! ## Architecture
//!
//! A run is a strictly sequential pipeline:
//! 1. **Fetching**: one feed search per keyword, filtered and deduplicated
//! 2. **Selection**: the model picks a story and explains why, as JSON
//! 3. **Writing**: the model drafts the post, optionally enhanced in a second pass
//! 4. **Output**: the post lands in `<output-dir>/<YYYY-MM-DD>-<slug>.md`
//!    and is handed to the publisher
//!
//! `serve` wraps the same pipeline in a single-job scheduler whose schedule
//! is persisted as JSON and managed over HTTP.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod agents;
mod api;
mod cli;
mod error;
mod models;
mod outputs;
mod pipeline;
mod prompts;
mod publish;
mod sanitize;
mod scheduler;
mod server;
mod sources;
#[cfg(test)]
mod testing;
mod utils;

use api::OllamaClient;
use cli::{Cli, Command};
use pipeline::{Pipeline, RunPipeline};
use scheduler::ScheduleService;
use sources::google_news::GoogleNewsSource;
use sources::load_keywords;
use utils::ensure_writable_dir;

type BlogPipeline = Pipeline<GoogleNewsSource, OllamaClient>;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; flags and the real environment still apply.
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    info!(version = env!("CARGO_PKG_VERSION"), "tech_news_blogger starting up");

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let pipeline = build_pipeline(&args).await?;

    match args.command() {
        Command::Run => {
            // Failures are logged by the pipeline; the run itself exits cleanly.
            let _ = pipeline.run_once().await;
        }
        Command::Serve {
            bind,
            schedule_file,
        } => {
            let service = ScheduleService::load(&schedule_file, Arc::new(pipeline)).await;
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!(
                addr = %bind,
                schedule_file = %service.path().display(),
                "HTTP control surface listening"
            );

            let app = server::router(Arc::new(service));
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn build_pipeline(args: &Cli) -> Result<BlogPipeline, Box<dyn Error>> {
    let keywords = load_keywords(&args.news.keywords_file).await;
    let source = GoogleNewsSource::new(args.news.settings(), keywords)?;
    let model = OllamaClient::new(args.model.settings())?;
    info!(model = model.model(), enhance = args.enhance, "Pipeline ready");

    Ok(Pipeline::new(source, model, &args.output_dir).with_enhancement(args.enhance))
}
