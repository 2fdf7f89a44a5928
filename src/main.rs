mod app;
mod config;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Concurrent token volume monitor with multi-source data and alerting")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// USD volume threshold that triggers an alert
    #[arg(long)]
    threshold: Option<f64>,

    /// Seconds between polls within a session
    #[arg(long)]
    tick_interval_secs: Option<u64>,

    /// Number of polls per session
    #[arg(long)]
    max_ticks: Option<u32>,

    /// Seconds an identifier stays muted after an alert
    #[arg(long)]
    cooldown_secs: Option<u64>,

    /// Maximum concurrently running sessions
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Seconds between stats reports
    #[arg(long)]
    stats_interval_secs: Option<u64>,

    /// Helius API key (overrides config)
    #[arg(long)]
    helius_api_key: Option<String>,

    /// Telegram bot token (overrides config)
    #[arg(long)]
    telegram_bot_token: Option<String>,

    /// Telegram chat id for alerts (overrides config)
    #[arg(long)]
    telegram_chat_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    // Priority: CLI args > Config file > Defaults
    let mut app_cfg = if let Some(config_path) = &args.config {
        app::AppCfg::from_config(config::Config::from_file(config_path)?)?
    } else {
        app::AppCfg::default()
    };

    if let Some(threshold) = args.threshold {
        app_cfg.volume_threshold = threshold;
    }
    if let Some(secs) = args.tick_interval_secs {
        app_cfg.tick_interval_secs = secs;
    }
    if let Some(ticks) = args.max_ticks {
        app_cfg.max_ticks = ticks;
    }
    if let Some(secs) = args.cooldown_secs {
        app_cfg.cooldown_secs = secs;
    }
    if let Some(cap) = args.max_concurrent {
        app_cfg.max_concurrent = cap;
    }
    if let Some(secs) = args.stats_interval_secs {
        app_cfg.stats_interval_secs = secs;
    }
    if let Some(api_key) = args.helius_api_key {
        app_cfg.helius_api_key = Some(api_key);
    }
    if let Some(token) = args.telegram_bot_token {
        app_cfg.telegram_bot_token = Some(token);
    }
    if let Some(chat_id) = args.telegram_chat_id {
        app_cfg.telegram_chat_id = Some(chat_id);
    }

    app::run(app_cfg).await
}
