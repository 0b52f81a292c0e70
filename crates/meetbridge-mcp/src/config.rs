//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use meetbridge_google::config::DEFAULT_CALLBACK_PORT;
use meetbridge_google::GoogleConfig;

use crate::args::ArgDefaults;

#[derive(Parser, Debug, Clone)]
#[command(name = "meetbridge-mcp", version, about = "Google Workspace tools over MCP")]
pub struct Args {
    #[arg(long, env = "MEETBRIDGE_TRANSPORT", default_value = "stdio")]
    pub transport: String,

    /// Credential-source file (service account key or installed-app client).
    #[arg(long, env = "MEETBRIDGE_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Where the interactive flow persists its token.
    #[arg(long, env = "MEETBRIDGE_TOKEN")]
    pub token: Option<PathBuf>,

    #[arg(long, env = "MEETBRIDGE_CALLBACK_PORT", default_value_t = DEFAULT_CALLBACK_PORT)]
    pub callback_port: u16,

    /// IANA zone for calendar events created without one.
    #[arg(long, env = "MEETBRIDGE_TIMEZONE")]
    pub timezone: Option<String>,

    /// User to impersonate with a service account.
    #[arg(long, env = "MEETBRIDGE_IMPERSONATE")]
    pub impersonate: Option<String>,

    /// Print the authorization URL without opening a browser.
    #[arg(long, env = "MEETBRIDGE_NO_BROWSER")]
    pub no_browser: bool,

    /// Give up on the interactive flow after this many seconds.
    #[arg(long, env = "MEETBRIDGE_AUTH_TIMEOUT_SECS")]
    pub auth_timeout_secs: Option<u64>,

    /// Used when RUST_LOG is not set.
    #[arg(long, env = "MEETBRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn google_config(&self) -> anyhow::Result<GoogleConfig> {
        let mut config = GoogleConfig::new()?;
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(path) = &self.token {
            config.token_path = path.clone();
        }
        config.callback_port = self.callback_port;
        if let Some(tz) = &self.timezone {
            if tz.parse::<chrono_tz::Tz>().is_err() {
                anyhow::bail!("unknown timezone '{}'", tz);
            }
            config.default_timezone = tz.clone();
        }
        config.impersonate = self.impersonate.clone();
        config.open_browser = !self.no_browser;
        config.auth_timeout = self.auth_timeout_secs.map(Duration::from_secs);
        Ok(config)
    }
}

pub fn arg_defaults(config: &GoogleConfig) -> ArgDefaults {
    ArgDefaults {
        timezone: config.default_timezone.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_onto_google_config() {
        let args = Args::parse_from([
            "meetbridge-mcp",
            "--credentials",
            "/tmp/creds.json",
            "--timezone",
            "Europe/Dublin",
            "--no-browser",
            "--auth-timeout-secs",
            "90",
            "--callback-port",
            "8765",
        ]);
        let config = args.google_config().unwrap();
        assert_eq!(config.credentials_path, PathBuf::from("/tmp/creds.json"));
        assert_eq!(config.default_timezone, "Europe/Dublin");
        assert!(!config.open_browser);
        assert_eq!(config.auth_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:8765/oauth2callback");
        assert_eq!(arg_defaults(&config).timezone, "Europe/Dublin");
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let args = Args::parse_from(["meetbridge-mcp", "--timezone", "Nowhere/Special"]);
        assert!(args.google_config().is_err());
    }
}
