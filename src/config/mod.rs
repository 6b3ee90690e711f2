pub mod toml_config;

use crate::adapters::viacep::{ViaCepConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_VIACEP_URL};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_positive_number, validate_socket_addr, validate_url, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "cep-service")]
#[command(about = "Brazilian postal code (CEP) address service with ViaCEP fallback")]
pub struct CliConfig {
    #[arg(long, env = "CEP_BIND", help = "Address to listen on [default: 0.0.0.0:8080]")]
    pub bind: Option<String>,

    #[arg(
        long,
        env = "DATABASE_URL",
        help = "SQLite database URL; in-memory store when omitted"
    )]
    pub database_url: Option<String>,

    #[arg(long, help = "Maximum pooled database connections")]
    pub max_connections: Option<u32>,

    #[arg(long, env = "VIACEP_URL", help = "ViaCEP base URL")]
    pub viacep_url: Option<String>,

    #[arg(long, help = "ViaCEP request timeout in seconds")]
    pub viacep_timeout_secs: Option<u64>,

    #[arg(short, long, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

/// 合併命令列與設定檔後的最終設定 (命令列優先)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub viacep_url: String,
    pub viacep_timeout_secs: u64,
    pub verbose: bool,
    pub json_logs: bool,
}

impl ServiceConfig {
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        file.validate()?;
        Ok(Self::merge(cli, &file))
    }

    pub fn merge(cli: &CliConfig, file: &TomlConfig) -> Self {
        Self {
            bind: cli
                .bind
                .clone()
                .or_else(|| file.bind().map(str::to_string))
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_url: cli
                .database_url
                .clone()
                .or_else(|| file.database_url().map(str::to_string)),
            max_connections: cli
                .max_connections
                .or_else(|| file.max_connections())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            viacep_url: cli
                .viacep_url
                .clone()
                .or_else(|| file.viacep_url().map(str::to_string))
                .unwrap_or_else(|| DEFAULT_VIACEP_URL.to_string()),
            viacep_timeout_secs: cli
                .viacep_timeout_secs
                .or_else(|| file.viacep_timeout_secs())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            verbose: cli.verbose || file.verbose().unwrap_or(false),
            json_logs: cli.json_logs || file.json_logs().unwrap_or(false),
        }
    }

    pub fn viacep(&self) -> ViaCepConfig {
        ViaCepConfig {
            base_url: self.viacep_url.clone(),
            timeout: Duration::from_secs(self.viacep_timeout_secs),
        }
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validate_socket_addr("bind", &self.bind)?;
        validate_url("viacep_url", &self.viacep_url)?;
        validate_positive_number("viacep_timeout_secs", self.viacep_timeout_secs, 1)?;
        validate_positive_number("max_connections", u64::from(self.max_connections), 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = ServiceConfig::merge(&CliConfig::default(), &TomlConfig::default());

        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.database_url, None);
        assert_eq!(config.viacep_url, DEFAULT_VIACEP_URL);
        assert_eq!(config.viacep_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = TomlConfig::from_toml_str(
            r#"
[server]
bind = "127.0.0.1:9000"

[database]
url = "sqlite://file.db"

[viacep]
timeout_seconds = 3
"#,
        )
        .unwrap();
        let cli = CliConfig {
            database_url: Some("sqlite://cli.db".to_string()),
            ..Default::default()
        };

        let config = ServiceConfig::merge(&cli, &file);

        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.database_url.as_deref(), Some("sqlite://cli.db"));
        assert_eq!(config.viacep_timeout_secs, 3);
        assert_eq!(config.viacep().timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_merged_config() {
        let cli = CliConfig {
            bind: Some("not-an-address".to_string()),
            ..Default::default()
        };
        let config = ServiceConfig::merge(&cli, &TomlConfig::default());
        assert!(config.validate().is_err());
    }
}
