//! Spark Chat Binary
//!
//! Asks one question and prints the streamed answer.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin spark-chat -- "What is a monad?"
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `SPARK_APP_ID`: Application id
//! - `SPARK_API_KEY`: API key
//! - `SPARK_API_SECRET`: API secret used for signing
//!
//! ## Optional
//! - `SPARK_ENDPOINT`: Chat endpoint (default: <ws://spark-api.xf-yun.com/v1.1/chat>)
//! - `SPARK_ORIGIN`: Handshake origin (default: <http://spark-api.xf-yun.com>)
//! - `SPARK_USER_ID`: User id sent with the request (default: cli)
//! - `SPARK_STREAM_DEADLINE_SECS`: Overall receive deadline, 0 disables (default: 60)
//! - `SPARK_MAX_FRAMES`: Frame ceiling, 0 disables (default: 4096)
//! - `LOG_FORMAT`: `json` for structured logs
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::{Context, bail};
use spark_stream_client::infrastructure::telemetry;
use spark_stream_client::{ChatClient, ClientConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// User id when `SPARK_USER_ID` is unset.
const DEFAULT_USER_ID: &str = "cli";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        bail!("Failed to install rustls crypto provider");
    }

    load_dotenv();

    telemetry::init();

    let message = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if message.trim().is_empty() {
        bail!("usage: spark-chat <message>");
    }
    let user_id = std::env::var("SPARK_USER_ID")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    let config = ClientConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let cancel = CancellationToken::new();
    let client = ChatClient::new(Arc::new(config)).with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling");
            cancel.cancel();
        }
    });

    match client.ask(&user_id, &message).await {
        Ok(answer) => {
            println!("{}", answer.text);
            if let Some(usage) = answer.usage {
                tracing::info!(
                    total_tokens = usage.total_tokens,
                    frames = answer.frames,
                    "Answer complete"
                );
            }
            Ok(())
        }
        Err(failure) => {
            if !failure.partial_text().is_empty() {
                eprintln!("{}", failure.partial_text());
            }
            Err(anyhow::Error::new(failure.error)
                .context(format!("chat failed after {} frames", failure.partial.frames)))
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        endpoint = %config.endpoint,
        domain = %config.chat.domain,
        max_tokens = config.chat.max_tokens,
        "Configuration loaded"
    );
    tracing::debug!(
        origin = %config.origin,
        deadline = ?config.stream.deadline,
        max_frames = ?config.stream.max_frames,
        clock_offset_secs = config.clock_offset.num_seconds(),
        "Stream settings"
    );
}
