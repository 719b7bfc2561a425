use std::{
    env,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use validator::Validate;

pub static DEFAULT_PORT: u16 = 8000;
pub static DEFAULT_MODEL_PATH: &str = "models/fraud_pipeline_v1.onnx";
pub static DEFAULT_MODEL_THREADS: u16 = 1;
pub static DEFAULT_BODY_LIMIT_BYTES: u32 = 64 * 1024;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Envy {
    pub app_env: Option<String>,
    pub port: Option<u16>,

    pub database_url: Option<String>,
    #[validate(range(
        min = 1,
        max = 100,
        message = "database_max_connections must be between 1 and 100."
    ))]
    pub database_max_connections: Option<u32>,

    pub model_path: Option<String>,
    #[validate(range(min = 1, max = 64, message = "model_threads must be between 1 and 64."))]
    pub model_threads: Option<u16>,

    #[validate(range(min = 1, message = "rate_limit_per_second must be at least 1."))]
    pub rate_limit_per_second: Option<u32>,
    #[validate(range(
        min = 1,
        max = 1048576,
        message = "body_limit_bytes must be between 1 and 1048576."
    ))]
    pub body_limit_bytes: Option<u32>,
}

impl Envy {
    /// Reads `.env.{APP_ENV}` from the working directory into the process
    /// environment, without overriding variables that are already set.
    /// Called before logging starts so the file can carry `RUST_LOG`.
    pub fn load_dotenv() -> Option<PathBuf> {
        let app_env = env::var("APP_ENV").unwrap_or("development".to_string());

        load_dotenv_file(Path::new("."), &app_env)
    }

    /// Reads `.env.{APP_ENV}` when present, then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_dotenv();

        let envy = envy::from_env::<Envy>()?;
        envy.validate()?;

        Ok(envy)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn model_path(&self) -> &str {
        self.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH)
    }

    pub fn model_threads(&self) -> usize {
        self.model_threads.unwrap_or(DEFAULT_MODEL_THREADS) as usize
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_bytes.unwrap_or(DEFAULT_BODY_LIMIT_BYTES) as usize
    }

    // An empty DATABASE_URL counts as unset.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

fn load_dotenv_file(dir: &Path, app_env: &str) -> Option<PathBuf> {
    let path = dir.join(format!(".env.{}", app_env));
    dotenvy::from_path(&path).ok()?;

    Some(path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let envy = Envy::default();

        assert_eq!(envy.port(), 8000);
        assert_eq!(envy.model_path(), "models/fraud_pipeline_v1.onnx");
        assert_eq!(envy.model_threads(), 1);
        assert_eq!(envy.body_limit_bytes(), 64 * 1024);
        assert!(envy.database_url().is_none());
        assert!(envy.validate().is_ok());
    }

    #[test]
    fn blank_database_url_is_treated_as_missing() {
        let envy = Envy {
            database_url: Some("  ".to_string()),
            ..Default::default()
        };

        assert!(envy.database_url().is_none());
    }

    #[test]
    fn out_of_range_pool_size_is_rejected() {
        let envy = Envy {
            database_max_connections: Some(0),
            ..Default::default()
        };

        assert!(envy.validate().is_err());
    }

    #[test]
    fn zero_model_threads_is_rejected() {
        let envy = Envy {
            model_threads: Some(0),
            ..Default::default()
        };

        assert!(envy.validate().is_err());
    }

    #[test]
    fn dotenv_file_populates_process_environment() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env.staging"),
            "FRAUD_SCORING_DOTENV_LOG_FILTER=fraud_scoring_api=debug\n",
        )
        .unwrap();

        let loaded = load_dotenv_file(dir.path(), "staging");

        assert_eq!(loaded, Some(dir.path().join(".env.staging")));
        assert_eq!(
            env::var("FRAUD_SCORING_DOTENV_LOG_FILTER").unwrap(),
            "fraud_scoring_api=debug"
        );
    }

    #[test]
    fn missing_dotenv_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(load_dotenv_file(dir.path(), "production"), None);
    }

    #[test]
    fn zero_body_limit_is_rejected() {
        let envy = Envy {
            body_limit_bytes: Some(0),
            ..Default::default()
        };

        assert!(envy.validate().is_err());
    }
}
