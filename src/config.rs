use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorCfg {
    pub volume_threshold: Option<f64>,
    pub tick_interval_secs: Option<u64>,
    pub max_ticks: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsCfg {
    pub cooldown_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionCfg {
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeliusCfg {
    pub api_key: String,
    pub base_url: Option<String>,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexScreenerCfg {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesCfg {
    pub helius: Option<HeliusCfg>,
    pub dexscreener: Option<DexScreenerCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkCfg {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub monitor: Option<MonitorCfg>,
    pub alerts: Option<AlertsCfg>,
    pub admission: Option<AdmissionCfg>,
    pub sources: Option<SourcesCfg>,
    pub sink: Option<SinkCfg>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())?;
        let cfg: Self = toml::from_str(&s).context("parse Config.toml")?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [monitor]
            volume_threshold = 7500.0
            tick_interval_secs = 30
            max_ticks = 10

            [alerts]
            cooldown_secs = 300

            [admission]
            max_concurrent = 25

            [sources.helius]
            api_key = "test-key"

            [sources.dexscreener]
            base_url = "https://api.dexscreener.com/latest/dex"

            [sink]
            bot_token = "123:abc"
            chat_id = "-100200300"
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert_eq!(cfg.monitor.as_ref().unwrap().volume_threshold, Some(7500.0));
        assert_eq!(cfg.admission.as_ref().unwrap().max_concurrent, Some(25));
        assert_eq!(cfg.sources.as_ref().unwrap().helius.as_ref().unwrap().api_key, "test-key");
        assert_eq!(cfg.sink.as_ref().unwrap().chat_id.as_deref(), Some("-100200300"));
    }

    #[test]
    fn test_partial_config_leaves_defaults_to_caller() {
        let cfg: Config = toml::from_str("[monitor]\nmax_ticks = 3\n").unwrap();
        assert_eq!(cfg.monitor.as_ref().unwrap().max_ticks, Some(3));
        assert!(cfg.monitor.as_ref().unwrap().volume_threshold.is_none());
        assert!(cfg.sink.is_none());
    }
}
