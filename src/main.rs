use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use skein_core::config::AppConfig;
use skein_engine::AppContext;
use skein_llm::OpenAiGenerator;
use skein_slack::SlackClient;
use skein_store::Database;
use skein_telemetry::{init_telemetry, TelemetryConfig};

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u32 = 2000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::default());
    tracing::info!("starting skein");

    let data_dir = std::env::var("SKEIN_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".skein"));
    let config_path = std::env::var("SKEIN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join("config.json"));

    let config = AppConfig::load(&config_path)?;
    tracing::info!(
        path = %config_path.display(),
        sources = config.monitored.len(),
        "config loaded"
    );

    let db = Database::open(&data_dir.join("skein.db"))?;

    let platform = Arc::new(SlackClient::new(
        secret_env("SLACK_XOXC_TOKEN")?,
        secret_env("SLACK_COOKIE")?,
    ));

    let model =
        std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let generator = Arc::new(OpenAiGenerator::new(
        secret_env("OPENAI_API_KEY")?,
        model,
        DEFAULT_MAX_TOKENS,
    ));

    let ctx = AppContext::new(db, platform, generator, config);

    if ctx.config.sync.auto_sync_enabled {
        let period = Duration::from_secs(ctx.config.sync.sync_interval_minutes * 60);
        tracing::info!(
            interval_minutes = ctx.config.sync.sync_interval_minutes,
            "auto sync enabled"
        );
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match ctx.sync.sync_all_threads().await {
                        Ok(report) => tracing::info!(
                            synced = report.synced,
                            failed = report.failed,
                            new_messages = report.new_messages_total,
                            "scheduled sync complete"
                        ),
                        Err(e) => tracing::error!(error = %e, "scheduled sync failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("shutting down");
    Ok(())
}

fn secret_env(name: &str) -> anyhow::Result<SecretString> {
    std::env::var(name)
        .map(SecretString::from)
        .map_err(|_| anyhow::anyhow!("{name} must be set"))
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
