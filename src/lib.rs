pub mod api;
pub mod assist;
pub mod cli;
pub mod error;
pub mod models;
pub mod push;
pub mod render;
pub mod session;

use api::{ HttpSisterApi, SisterApi };
use assist::{ request_code_review, request_suggestion };
use cli::{ Args, Command };
use log::{ info, warn };
use push::PUSH_NAMESPACE;
use render::TerminalRenderer;
use serde_json::Value as JsonValue;
use session::SessionController;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Sister Chat Configuration ---");
    info!("Backend URL: {}", args.base_url);
    info!("Cookie Set: {}", !args.cookie.is_empty());
    info!("Page: {}", args.page);
    info!("Push URL: {}", args.push_url.as_deref().unwrap_or("(disabled)"));
    if let Some(secs) = args.request_timeout_secs {
        info!("Request Timeout: {}s", secs);
    }
    info!("---------------------------------");

    let api: Arc<dyn SisterApi> = Arc::new(HttpSisterApi::new(&args.api_config())?);

    match args.command.clone().unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&args, api).await,
        Command::Review { file, language } => {
            let code = tokio::fs::read_to_string(&file).await?;
            println!("{}", request_code_review(api.as_ref(), &code, language.as_deref()).await);
            Ok(())
        }
        Command::Suggest { project_info } => {
            let project_info: JsonValue = serde_json::from_str(&project_info)?;
            println!("{}", request_suggestion(api.as_ref(), &project_info).await);
            Ok(())
        }
        Command::Status => {
            let report = api.status().await?;
            println!("{}: {} ({})", report.sister_name, report.message, report.status);
            println!(
                "chat={} code_review={} suggestions={} real_time={}",
                report.features.chat,
                report.features.code_review,
                report.features.suggestions,
                report.features.real_time
            );
            Ok(())
        }
    }
}

async fn run_chat(
    args: &Args,
    api: Arc<dyn SisterApi>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let renderer = Arc::new(TerminalRenderer::new());
    let mut controller = SessionController::new(api, renderer, args.session_options());

    if let Some(push_url) = &args.push_url {
        match push::connect(push_url, PUSH_NAMESPACE).await {
            Ok(channel) => controller.attach_push(channel),
            Err(e) => warn!("Push channel unavailable, continuing without it: {}", e),
        }
    }
    if !args.no_history {
        controller.load_history().await;
    }
    controller.toggle_open().await;
    println!("Type a message and press Enter. /toggle hides or shows the chat, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => {
                break;
            }
            "/toggle" => {
                controller.toggle_open().await;
            }
            _ => {
                controller.send_user_message(&line).await;
            }
        }
    }

    controller.shutdown();
    info!("Chat session closed");
    Ok(())
}
