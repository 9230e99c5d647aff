use std::env;

use interfaces_github_watchers::index::Credentials;
use thiserror::Error;

const DEFAULT_REPO_OWNER: &str = "symfony";
const DEFAULT_REPO_NAME: &str = "symfony";
const DEFAULT_TABLE: &str = "github";

/// Runtime configuration, read from the environment.
///
/// `GITHUB_TOKEN` wins over `GITHUB_USERNAME`/`GITHUB_PASSWORD` when both are set.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub credentials: Credentials,
    pub repo_owner: String,
    pub repo_name: String,
    pub table: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MissingEnvVar: {name}")]
    MissingEnvVar { name: &'static str },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| value(name).ok_or(ConfigError::MissingEnvVar { name });

        let database_url = required("DATABASE_URL")?;

        let credentials = match value("GITHUB_TOKEN") {
            Some(token) => Credentials::Token(token),
            None => {
                let password = value("GITHUB_PASSWORD");
                let missing = if password.is_some() { "GITHUB_USERNAME" } else { "GITHUB_TOKEN" };
                let username = value("GITHUB_USERNAME")
                    .ok_or(ConfigError::MissingEnvVar { name: missing })?;
                let password = password.ok_or(ConfigError::MissingEnvVar { name: "GITHUB_PASSWORD" })?;
                Credentials::Basic { username, password }
            }
        };

        Ok(Self {
            database_url,
            credentials,
            repo_owner: value("WATCHERS_REPO_OWNER").unwrap_or_else(|| DEFAULT_REPO_OWNER.into()),
            repo_name: value("WATCHERS_REPO_NAME").unwrap_or_else(|| DEFAULT_REPO_NAME.into()),
            table: value("WATCHERS_TABLE").unwrap_or_else(|| DEFAULT_TABLE.into()),
        })
    }
}
