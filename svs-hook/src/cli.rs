//! Command-line arguments
//!
//! Every argument also reads an `SVS_*` environment variable and, when set,
//! overrides the matching field of the TOML configuration.

use std::path::PathBuf;

use clap::Parser;
use svs_common::config::ServiceConfig;

/// Command-line arguments for svs-hook
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "svs-hook")]
#[command(about = "SMS serial number validation service")]
#[command(version)]
pub struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "SVS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5800
    #[arg(short, long, env = "SVS_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// SQLite database file
    #[arg(long, env = "SVS_DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    /// Secret path segment of the webhook URL
    #[arg(long, env = "SVS_CALLBACK_TOKEN", hide_env_values = true)]
    pub callback_token: Option<String>,

    /// Bearer token for admin routes
    #[arg(long, env = "SVS_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// SMS provider endpoint
    #[arg(long, env = "SVS_NOTIFIER_URL")]
    pub notifier_url: Option<String>,

    /// Import this workbook (JSON) before serving
    #[arg(long)]
    pub import: Option<PathBuf>,
}

impl Args {
    /// Apply command-line overrides on top of `config`
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(addr) = &self.bind_addr {
            config.bind_addr = addr.clone();
        }
        if let Some(path) = &self.database_path {
            config.database_path = path.clone();
        }
        if let Some(token) = &self.callback_token {
            config.callback_token = token.clone();
        }
        if let Some(token) = &self.admin_token {
            config.admin_token = token.clone();
        }
        if let Some(url) = &self.notifier_url {
            config.notifier.url = Some(url.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = ServiceConfig::default();
        Args::default().apply(&mut config);
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    #[serial]
    fn test_overrides_replace_fields() {
        let args = Args::try_parse_from([
            "svs-hook",
            "--bind-addr",
            "0.0.0.0:9000",
            "--callback-token",
            "hook-secret",
            "--notifier-url",
            "https://sms.example/send",
        ])
        .unwrap();

        let mut config = ServiceConfig::default();
        args.apply(&mut config);

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.callback_token, "hook-secret");
        assert_eq!(config.notifier.url.as_deref(), Some("https://sms.example/send"));
        assert!(config.admin_token.is_empty());
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("SVS_ADMIN_TOKEN", "from-env");
        let args = Args::try_parse_from(["svs-hook"]).unwrap();
        std::env::remove_var("SVS_ADMIN_TOKEN");

        assert_eq!(args.admin_token.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn test_flag_beats_env_var() {
        std::env::set_var("SVS_ADMIN_TOKEN", "from-env");
        let args = Args::try_parse_from(["svs-hook", "--admin-token", "from-flag"]).unwrap();
        std::env::remove_var("SVS_ADMIN_TOKEN");

        assert_eq!(args.admin_token.as_deref(), Some("from-flag"));
    }
}
