use clap::{ Parser, Subcommand };
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ApiConfig;
use crate::session::SessionOptions;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the Sister backend (e.g., http://127.0.0.1:8000)
    #[arg(long, env = "SISTER_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Cookie header sent with every request; its csrftoken value becomes X-CSRFToken
    #[arg(long, env = "SISTER_COOKIE", default_value = "")]
    pub cookie: String,

    /// Per-request timeout in seconds. Unset means the HTTP client default.
    #[arg(long, env = "SISTER_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    // --- Session Args ---
    /// Page path reported to the assistant as chat context.
    #[arg(long, env = "SISTER_PAGE", default_value = "/")]
    pub page: String,

    /// Base URL of the socket.io push server. Push is disabled when unset.
    #[arg(long, env = "SISTER_PUSH_URL")]
    pub push_url: Option<String>,

    /// Skip restoring server history on start.
    #[arg(long, env = "SISTER_NO_HISTORY", default_value = "false")]
    pub no_history: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive chat session (default).
    Chat,
    /// Ask for a review of a source file.
    Review {
        /// File to review.
        file: PathBuf,
        /// Language hint sent with the code.
        #[arg(long)]
        language: Option<String>,
    },
    /// Ask for a project suggestion. Takes the project description as JSON.
    Suggest {
        project_info: String,
    },
    /// Print backend status.
    Status,
}

impl Args {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            cookie: self.cookie.clone(),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions { page: self.page.clone() }
    }
}
