//! Thin long-poll bridge from Telegram to `golem-engine`. Maps each
//! Telegram chat ID to a stable engine session ID and otherwise just
//! shuttles text both ways: `getUpdates` → dispatch → `sendMessage`,
//! backing off on HTTP 409 (another poller holds the long-poll slot).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use golem_config::{AppConfig, SraixConfig};
use golem_engine::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "golem-telegram", version, about = "Telegram bridge for the golem AIML engine")]
struct Args {
    /// AIML content directory to load before polling starts.
    aiml_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    sraix_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let app_config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::default(),
    };
    let sraix_config = match &args.sraix_config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SraixConfig::default(),
    };

    let token = if !app_config.telegram.bot_token.is_empty() {
        app_config.telegram.bot_token.clone()
    } else {
        std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?
    };
    if token.trim().is_empty() {
        bail!("telegram bot token is empty");
    }

    let engine = Engine::new(app_config.engine, sraix_config);
    load_aiml_dir(&engine, &args.aiml_dir).await?;
    tracing::info!(categories = engine.category_count().await, "golem-telegram loaded knowledge base");

    run_poll_loop(&engine, &token, &app_config.telegram).await
}

async fn load_aiml_dir(engine: &Engine, dir: &PathBuf) -> Result<()> {
    for entry in walk(dir)? {
        match entry.extension().and_then(|e| e.to_str()) {
            Some("properties") => engine.load_properties_file(&entry).await?,
            Some("set") => engine.load_set_file(&entry).await?,
            Some("map") => engine.load_map_file(&entry).await?,
            Some("aiml") | Some("xml") => {
                engine.load_aiml_file(&entry).await?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn walk(dir: &PathBuf) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(walk(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

async fn run_poll_loop(engine: &Engine, token: &str, config: &golem_config::TelegramConfig) -> Result<()> {
    let client = Client::new();
    let base_url = format!("https://api.telegram.org/bot{token}");
    let mut offset: i64 = 0;

    tracing::info!("listening for telegram updates");

    loop {
        let updates = match fetch_updates(&client, &base_url, offset, config.poll_timeout_secs).await {
            Ok(u) => u,
            Err(err) => {
                let err_str = err.to_string();
                if err_str.contains("409") {
                    tracing::warn!("telegram 409 conflict: another instance is polling, backing off");
                    tokio::time::sleep(Duration::from_secs(config.conflict_backoff_secs)).await;
                } else {
                    tracing::warn!(error = %err, "telegram getUpdates failed, retrying in 5s");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                continue;
            }
        };

        for update in updates {
            offset = update.update_id + 1;

            let Some(message) = update.message else { continue };
            let Some(text) = message.text else { continue };
            let chat_id = message.chat.id;
            let session_id = format!("telegram:{chat_id}");

            let response = match engine.respond(text.trim(), &session_id).await {
                Ok(r) => r,
                Err(err) => {
                    tracing::warn!(chat_id, error = %err, "respond failed");
                    format!("error: {err}")
                }
            };

            for chunk in chunk_message(&response, 3500) {
                if let Err(err) = send_message(&client, &base_url, chat_id, &chunk).await {
                    tracing::warn!(chat_id, error = %err, "sendMessage failed");
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}

async fn fetch_updates(client: &Client, base_url: &str, offset: i64, poll_timeout_secs: u64) -> Result<Vec<TelegramUpdate>> {
    let url = format!("{base_url}/getUpdates");
    let response = client
        .get(url)
        .query(&[("timeout", poll_timeout_secs.to_string()), ("offset", offset.to_string())])
        .send()
        .await?
        .error_for_status()?;

    let payload: TelegramResponse<Vec<TelegramUpdate>> = response.json().await?;
    if !payload.ok {
        bail!(payload.description.unwrap_or_else(|| "telegram getUpdates failed".to_string()));
    }
    Ok(payload.result.unwrap_or_default())
}

async fn send_message(client: &Client, base_url: &str, chat_id: i64, text: &str) -> Result<()> {
    let url = format!("{base_url}/sendMessage");
    let body = SendMessageRequest { chat_id, text, disable_web_page_preview: true };

    let response = client.post(url).json(&body).send().await?.error_for_status()?;

    let payload: TelegramResponse<serde_json::Value> = response.json().await?;
    if !payload.ok {
        bail!(payload.description.unwrap_or_else(|| "telegram sendMessage failed".to_string()));
    }
    Ok(())
}

fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count() + 1;
        if current_len > 0 && current_len + line_len > max_chars {
            chunks.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }
        current.push_str(line);
        current.push('\n');
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}
