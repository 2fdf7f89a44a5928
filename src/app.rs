// src/app.rs
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::Config;
use volwatch::application::WatchEngine;
use volwatch::domain::admission::AdmissionController;
use volwatch::domain::alert::AlertTracker;
use volwatch::domain::source::{SourceKind, SourceRegistry};
use volwatch::infrastructure::notify::{AlertSink, LogSink, TelegramSink};
use volwatch::infrastructure::sources::{
    DataSourceAdapter, DexScreenerAdapter, HeliusAdapter, RateLimiterRegistry, SourceDispatcher,
};
use volwatch::shared::types::{MonitorSettings, SubmitContext};

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub volume_threshold: f64,
    pub tick_interval_secs: u64,
    pub max_ticks: u32,
    pub cooldown_secs: u64,
    pub max_concurrent: usize,
    pub stats_interval_secs: u64,

    pub helius_api_key: Option<String>,
    pub helius_base_url: String,
    pub helius_rpc_url: String,
    pub dexscreener_base_url: String,

    // Sink overrides (None = log-only sink)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            volume_threshold: 5000.0,
            tick_interval_secs: 60,
            max_ticks: 5,
            cooldown_secs: 600,
            max_concurrent: AdmissionController::DEFAULT_LIMIT,
            stats_interval_secs: 30,
            helius_api_key: None,
            helius_base_url: HeliusAdapter::DEFAULT_BASE_URL.to_string(),
            helius_rpc_url: HeliusAdapter::DEFAULT_RPC_URL.to_string(),
            dexscreener_base_url: DexScreenerAdapter::DEFAULT_BASE_URL.to_string(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: TelegramSink::DEFAULT_API_BASE.to_string(),
        }
    }
}

impl AppCfg {
    pub fn from_config(cfg: Config) -> Result<Self> {
        let mut app_cfg = Self::default();

        if let Some(monitor) = cfg.monitor {
            if let Some(threshold) = monitor.volume_threshold {
                app_cfg.volume_threshold = threshold;
            }
            if let Some(secs) = monitor.tick_interval_secs {
                app_cfg.tick_interval_secs = secs;
            }
            if let Some(ticks) = monitor.max_ticks {
                app_cfg.max_ticks = ticks;
            }
        }
        if let Some(alerts) = cfg.alerts {
            if let Some(secs) = alerts.cooldown_secs {
                app_cfg.cooldown_secs = secs;
            }
        }
        if let Some(admission) = cfg.admission {
            if let Some(cap) = admission.max_concurrent {
                app_cfg.max_concurrent = cap;
            }
        }
        if let Some(sources) = cfg.sources {
            if let Some(helius) = sources.helius {
                app_cfg.helius_api_key = Some(helius.api_key);
                if let Some(url) = helius.base_url {
                    app_cfg.helius_base_url = url;
                }
                if let Some(url) = helius.rpc_url {
                    app_cfg.helius_rpc_url = url;
                }
            }
            if let Some(dexscreener) = sources.dexscreener {
                if let Some(url) = dexscreener.base_url {
                    app_cfg.dexscreener_base_url = url;
                }
            }
        }
        if let Some(sink) = cfg.sink {
            app_cfg.telegram_bot_token = sink.bot_token;
            app_cfg.telegram_chat_id = sink.chat_id;
            if let Some(base) = sink.api_base {
                app_cfg.telegram_api_base = base;
            }
        }

        if app_cfg.max_ticks == 0 {
            return Err(anyhow!("monitor.max_ticks must be at least 1"));
        }
        if app_cfg.max_concurrent == 0 {
            return Err(anyhow!("admission.max_concurrent must be at least 1"));
        }
        Ok(app_cfg)
    }

    fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            max_ticks: self.max_ticks,
            volume_threshold: self.volume_threshold,
            alert_cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

fn build_engine(app_cfg: &AppCfg) -> Result<WatchEngine> {
    let rates: Vec<(SourceKind, u32)> = SourceRegistry::get_active_sources()
        .iter()
        .map(|source| (source.kind, source.max_calls_per_second))
        .collect();
    let limiters = RateLimiterRegistry::new(&rates);

    let mut adapters: Vec<Arc<dyn DataSourceAdapter>> = Vec::new();
    if let Some(api_key) = app_cfg.helius_api_key.clone() {
        let limiter = limiters
            .get(SourceKind::Helius)
            .ok_or_else(|| anyhow!("no rate limiter registered for Helius"))?;
        adapters.push(Arc::new(HeliusAdapter::new(
            app_cfg.helius_base_url.clone(),
            app_cfg.helius_rpc_url.clone(),
            api_key,
            limiter,
        )));
        info!("Helius adapter enabled");
    } else {
        warn!("no Helius API key configured, relying on DexScreener only");
    }

    let dex_limiter = limiters
        .get(SourceKind::DexScreener)
        .ok_or_else(|| anyhow!("no rate limiter registered for DexScreener"))?;
    let fallback: Arc<dyn DataSourceAdapter> = Arc::new(DexScreenerAdapter::new(
        app_cfg.dexscreener_base_url.clone(),
        dex_limiter,
    ));
    let dispatcher = Arc::new(SourceDispatcher::new(adapters, fallback));

    let sink: Arc<dyn AlertSink> = match (&app_cfg.telegram_bot_token, &app_cfg.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            info!("alerts will be delivered via Telegram");
            Arc::new(TelegramSink::new(
                app_cfg.telegram_api_base.clone(),
                token.clone(),
                chat_id.clone(),
            ))
        }
        _ => {
            info!("no Telegram credentials, alerts go to the log");
            Arc::new(LogSink)
        }
    };

    Ok(WatchEngine::new(
        dispatcher,
        Arc::new(AlertTracker::new()),
        Arc::new(AdmissionController::new(app_cfg.max_concurrent)),
        sink,
        app_cfg.settings(),
    ))
}

/// Main loop: read identifiers from stdin (one per line), submit each for
/// monitoring, print stats on a fixed cadence, stop cleanly on Ctrl-C.
pub async fn run(app_cfg: AppCfg) -> Result<()> {
    info!(
        "🚀 Starting volwatch: threshold ${:.0}, {} ticks x {}s, cap {}",
        app_cfg.volume_threshold,
        app_cfg.max_ticks,
        app_cfg.tick_interval_secs,
        app_cfg.max_concurrent
    );

    let engine = Arc::new(build_engine(&app_cfg)?);

    let mut stats_tick =
        tokio::time::interval(Duration::from_secs(app_cfg.stats_interval_secs.max(1)));
    stats_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => match line? {
                Some(line) => {
                    let identifier = line.trim();
                    if identifier.is_empty() {
                        continue;
                    }
                    let context = SubmitContext {
                        requester: Some("stdin".to_string()),
                        destination: None,
                    };
                    // Fire and forget: the session reports through the stats.
                    let _ = engine
                        .submit_identifier(identifier.to_string(), context)
                        .await;
                }
                None => {
                    info!("input closed, draining running sessions");
                    input_open = false;
                }
            },
            _ = stats_tick.tick() => {
                engine.print_engine_stats().await;
                if !input_open && engine.is_idle() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                engine.shutdown();
                break;
            }
        }
    }

    engine.print_engine_stats().await;
    info!("volwatch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_applies_overrides_over_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [monitor]
            volume_threshold = 9000.0

            [admission]
            max_concurrent = 10
        "#,
        )
        .unwrap();

        let app_cfg = AppCfg::from_config(cfg).unwrap();
        assert_eq!(app_cfg.volume_threshold, 9000.0);
        assert_eq!(app_cfg.max_concurrent, 10);
        // Untouched fields keep their defaults.
        assert_eq!(app_cfg.max_ticks, 5);
        assert_eq!(app_cfg.cooldown_secs, 600);
    }

    #[test]
    fn test_zero_ticks_is_rejected() {
        let cfg: Config = toml::from_str("[monitor]\nmax_ticks = 0\n").unwrap();
        assert!(AppCfg::from_config(cfg).is_err());
    }
}
