use anyhow::{Context, Result};
use clap::Parser;
use shared::{
    ensure_logged_in, login, Config, Credentials, History, InstagramClient, RepostOptions,
    Reposter, VerificationPrompt,
};
use std::io::{self as stdio, Write};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insta-reposter")]
#[command(version)]
#[command(about = "Repost saved Instagram posts with credit to the original owner")]
struct Args {}

/// Reads verification codes from the terminal.
struct StdinPrompt;

impl VerificationPrompt for StdinPrompt {
    fn verification_code(&mut self, reason: &str) -> Result<String> {
        print!("{}: ", reason);
        stdio::stdout().flush()?;

        let mut input = String::new();
        stdio::stdin()
            .read_line(&mut input)
            .context("Failed to read verification code")?;

        let code = input.trim().to_string();
        if code.is_empty() {
            anyhow::bail!("No verification code entered");
        }
        Ok(code)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let credentials = Credentials {
        username: &config.username,
        password: &config.password,
    };
    let mut prompt = StdinPrompt;

    let mut client = InstagramClient::new().context("Failed to create Instagram client")?;
    login(&mut client, &credentials, &config.cookies_file, &mut prompt).await?;

    let history = History::load(&config.history_file);
    let mut reposter = Reposter::new(client, history, RepostOptions::from(&config));

    info!(
        "Setting up scheduler to check every {} minutes",
        config.interval_minutes()
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    loop {
        match ensure_logged_in(
            reposter.api_mut(),
            &credentials,
            &config.cookies_file,
            &mut prompt,
        )
        .await
        {
            Ok(()) => match reposter.run_cycle().await {
                Ok(report) => info!(
                    "Cycle finished: {} fetched, {} already reposted, {} reposted, {} failed",
                    report.fetched, report.skipped, report.reposted, report.failed
                ),
                Err(e) => error!("Error during check: {:#}", e),
            },
            Err(e) => error!("Could not log in, skipping this check: {:#}", e),
        }

        if *shutdown_rx.borrow() {
            break;
        }

        info!(
            "Next check in {} minutes ({} posts in history)",
            config.interval_minutes(),
            reposter.history().len()
        );

        tokio::select! {
            _ = tokio::time::sleep(config.check_interval) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    info!("Bot stopped by user");
    reposter
        .history()
        .save()
        .context("Failed to save history on shutdown")?;

    Ok(())
}
