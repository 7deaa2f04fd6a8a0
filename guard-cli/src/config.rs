use config::{Config, Environment, File, Map};
use guard::BlockListConfig;
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Cfg {
    pub storage: CfgStorage,
    pub log: Option<CfgLog>,
    pub defaults: Option<CfgDefaults>,
}

#[derive(Debug, Deserialize)]
pub struct CfgStorage {
    pub base_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CfgLog {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Overrides for the built-in block-list, used until settings are saved.
#[derive(Debug, Deserialize)]
pub struct CfgDefaults {
    pub domains: Option<Vec<String>>,
    pub message: Option<String>,
}

impl Cfg {
    pub fn load(cfg_path: &str) -> Result<Self> {
        Self::load_with_env(cfg_path, None)
    }

    /// `env` stands in for the process environment when given.
    fn load_with_env(cfg_path: &str, env: Option<Map<String, String>>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(cfg_path))
            .add_source(
                Environment::with_prefix("FORMGUARD")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .into_diagnostic()?;

        let cfg: Cfg = settings.try_deserialize().into_diagnostic()?;

        Ok(cfg)
    }

    pub fn log_level(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn log_format(&self) -> LogFormat {
        self.log.as_ref().and_then(|l| l.format).unwrap_or_default()
    }

    pub fn block_list_defaults(&self) -> BlockListConfig {
        let builtin = BlockListConfig::default();
        match &self.defaults {
            None => builtin,
            Some(defaults) => BlockListConfig::new(
                defaults.domains.clone().unwrap_or(builtin.domains),
                defaults
                    .message
                    .clone()
                    .unwrap_or(builtin.rejection_message),
            ),
        }
    }
}
