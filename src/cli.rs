//! Command-line interface definitions for Tech News Blogger.
//!
//! Every option can also come from the environment (a `.env` file in the
//! working directory is loaded first), so a deployment can be configured
//! without flags at all.

use crate::api::ModelSettings;
use crate::sources::google_news::FeedSettings;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Generate technical blog posts from today's news.
///
/// # Examples
///
/// ```sh
/// # One post, then exit
/// tech_news_blogger
///
/// # Against a remote Ollama with a bigger model
/// tech_news_blogger --ollama-host http://gpu-box:11434 --ollama-model llama3 run
///
/// # Scheduler plus HTTP control surface
/// tech_news_blogger serve --bind 127.0.0.1:5000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub news: NewsArgs,

    /// Directory generated posts are written to
    #[arg(long, env = "OUTPUT_DIR", default_value = "output/posts", global = true)]
    pub output_dir: PathBuf,

    /// Pass each draft through a second, polishing model call
    #[arg(long, env = "BLOG_ENHANCE", global = true)]
    pub enhance: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate one post and exit (default)
    Run,
    /// Run the scheduler and its HTTP control surface
    Serve {
        /// Address the HTTP server listens on
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
        bind: String,

        /// Where the schedule is persisted
        #[arg(long, env = "SCHEDULE_FILE", default_value = "schedule.json")]
        schedule_file: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Base URL of the Ollama server
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434", global = true)]
    pub ollama_host: String,

    /// Model name passed to Ollama
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama2", global = true)]
    pub ollama_model: String,

    /// Request timeout in seconds
    #[arg(long, env = "OLLAMA_TIMEOUT", default_value_t = 300, global = true)]
    pub ollama_timeout: u64,

    /// Context window size (`num_ctx`)
    #[arg(long, env = "OLLAMA_NUM_CTX", default_value_t = 4096, global = true)]
    pub ollama_num_ctx: u32,
}

#[derive(Args, Debug, Clone)]
pub struct NewsArgs {
    /// Base URL of the news search feed
    #[arg(long, env = "NEWS_SOURCE", default_value = "https://news.google.com", global = true)]
    pub news_source: String,

    /// Feed language
    #[arg(long, env = "NEWS_LANGUAGE", default_value = "en", global = true)]
    pub news_language: String,

    /// Most candidate stories offered to the selector
    #[arg(long, env = "NEWS_NUM_STORIES", default_value_t = 10, global = true)]
    pub news_num_stories: usize,

    /// One search keyword per line
    #[arg(long, env = "KEYWORDS_FILE", default_value = "config/keywords.txt", global = true)]
    pub keywords_file: PathBuf,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

impl ModelArgs {
    pub fn settings(&self) -> ModelSettings {
        ModelSettings {
            host: self.ollama_host.clone(),
            model: self.ollama_model.clone(),
            timeout: Duration::from_secs(self.ollama_timeout),
            num_ctx: self.ollama_num_ctx,
        }
    }
}

impl NewsArgs {
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            base_url: self.news_source.clone(),
            language: self.news_language.clone(),
            num_stories: self.news_num_stories,
        }
    }
}
