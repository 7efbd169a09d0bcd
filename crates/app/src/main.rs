//! Focusmode console
//!
//! Loads configuration, starts the sync context and reads one command per
//! line from stdin until `quit`, end of input or Ctrl+C.

use anyhow::Context;
use focusmode_app::commands::{self, HELP};
use focusmode_app::utils::init_tracing;
use focusmode_app::{AppContext, Command};
use focusmode_infra::config;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment or a config file may be used.
    let _ = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialize logging")?;

    let ctx = AppContext::new(config).context("failed to build the application context")?;
    ctx.start().await;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{HELP}\n").as_bytes()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => match commands::execute(&ctx, command).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(error = %err, "Command failed");
                    format!("error: {err}")
                }
            },
            Err(err) => format!("error: {err}"),
        };
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    ctx.shutdown().await;
    Ok(())
}
