use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "shopctl/0.2";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_API_URL: &str = "ADMIN_API_URL";
pub const ENV_API_USER: &str = "ADMIN_API_USER";
pub const ENV_API_PASS: &str = "ADMIN_API_PASS";
pub const ENV_COOKIE_HEADER: &str = "COOKIE_HEADER";
pub const ENV_COOKIE_JAR: &str = "COOKIE_JAR";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ShopConfig {
    #[serde(default)]
    pub admin: AdminSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AdminSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl ShopConfig {
    /// Resolve the admin API endpoint: env ADMIN_API_URL > config.
    /// There is deliberately no built-in default endpoint.
    pub fn api_url(&self) -> Result<String> {
        if let Some(value) = non_empty_env(ENV_API_URL) {
            return Ok(value);
        }
        match &self.admin.api_url {
            Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            _ => bail!(
                "admin API endpoint is not configured (set {ENV_API_URL} or [admin].api_url in shopctl.toml)"
            ),
        }
    }

    /// Resolve credentials for the login mutation. Credentials are accepted
    /// from the environment only, never from the config file.
    pub fn credentials(&self) -> Result<AdminCredentials> {
        let username = non_empty_env(ENV_API_USER);
        let password = non_empty_env(ENV_API_PASS);
        match (username, password) {
            (Some(username), Some(password)) => Ok(AdminCredentials { username, password }),
            (None, Some(_)) => bail!("{ENV_API_USER} is required for login"),
            (Some(_), None) => bail!("{ENV_API_PASS} is required for login"),
            (None, None) => bail!("{ENV_API_USER} and {ENV_API_PASS} are required for login"),
        }
    }

    /// Resolve user agent: env SHOPCTL_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        if let Some(value) = non_empty_env("SHOPCTL_USER_AGENT") {
            return value;
        }
        self.admin
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Resolve the per-request timeout in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        if let Some(value) = env::var("SHOPCTL_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            return value;
        }
        self.admin.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }
}

/// Load and parse a ShopConfig from a TOML file. Returns default if the file
/// doesn't exist.
pub fn load_config(config_path: &Path) -> Result<ShopConfig> {
    if !config_path.exists() {
        return Ok(ShopConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ShopConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn non_empty_env(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
