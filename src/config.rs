//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::BrowserType;
use crate::services::{CleanupConfig, OrchestratorSettings, PlaywrightRunner};

/// Development default values.
pub mod defaults {
    pub const WORK_DIR: &str = "./temp";
    pub const RUNNER_PROGRAM: &str = "npx";
    pub const RUNNER_ARGS: &str = "playwright test";
    pub const RUNNER_TIMEOUT_SECS: u64 = 1800;
    pub const DEFAULT_BROWSER: &str = "chromium";
    pub const WORKSPACE_RETENTION_HOURS: u64 = 24;
    pub const CLEANUP_INTERVAL_SECS: u64 = 3600;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Parent directory of execution workspaces
    pub work_dir: PathBuf,
    /// Runner executable
    pub runner_program: String,
    /// Arguments placed before the test path
    pub runner_args: Vec<String>,
    /// Wall-clock limit for one runner process
    pub runner_timeout_secs: u64,
    /// Browser used when a request names none
    pub default_browser: BrowserType,
    /// Age after which leftover workspaces are swept
    pub workspace_retention_hours: u64,
    /// Seconds between cleanup sweeps
    pub cleanup_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `NCPW_WORK_DIR`: Execution workspace root (default: ./temp)
    /// - `NCPW_RUNNER_PROGRAM`: Runner executable (default: npx)
    /// - `NCPW_RUNNER_ARGS`: Whitespace-separated leading arguments (default: "playwright test")
    /// - `NCPW_RUNNER_TIMEOUT_SECS`: Runner wall-clock limit (default: 1800)
    /// - `NCPW_DEFAULT_BROWSER`: chromium, firefox or webkit (default: chromium)
    /// - `NCPW_WORKSPACE_RETENTION_HOURS`: Leftover workspace retention (default: 24)
    /// - `NCPW_CLEANUP_INTERVAL_SECS`: Cleanup sweep interval (default: 3600)
    ///
    /// In production the work dir must be absolute and the timeout non-zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let work_dir = PathBuf::from(
            env::var("NCPW_WORK_DIR").unwrap_or_else(|_| defaults::WORK_DIR.to_string()),
        );

        let runner_program = env::var("NCPW_RUNNER_PROGRAM")
            .unwrap_or_else(|_| defaults::RUNNER_PROGRAM.to_string());

        let runner_args = env::var("NCPW_RUNNER_ARGS")
            .unwrap_or_else(|_| defaults::RUNNER_ARGS.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let runner_timeout_secs = env::var("NCPW_RUNNER_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults::RUNNER_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("NCPW_RUNNER_TIMEOUT_SECS must be a valid number")
            })?;

        let default_browser = BrowserType::parse(
            &env::var("NCPW_DEFAULT_BROWSER")
                .unwrap_or_else(|_| defaults::DEFAULT_BROWSER.to_string()),
        )
        .ok_or(ConfigError::InvalidValue(
            "NCPW_DEFAULT_BROWSER must be chromium, firefox or webkit",
        ))?;

        let workspace_retention_hours = env::var("NCPW_WORKSPACE_RETENTION_HOURS")
            .unwrap_or_else(|_| defaults::WORKSPACE_RETENTION_HOURS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("NCPW_WORKSPACE_RETENTION_HOURS must be a valid number")
            })?;

        let cleanup_interval_secs = env::var("NCPW_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| defaults::CLEANUP_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("NCPW_CLEANUP_INTERVAL_SECS must be a valid number")
            })?;

        let config = Config {
            environment,
            work_dir,
            runner_program,
            runner_args,
            runner_timeout_secs,
            default_browser,
            workspace_retention_hours,
            cleanup_interval_secs,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Reject settings that only make sense on a developer machine.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.work_dir.is_absolute() {
            errors.push(format!(
                "NCPW_WORK_DIR '{}' is relative. Set an absolute workspace directory.",
                self.work_dir.display()
            ));
        }

        if self.runner_timeout_secs == 0 {
            errors.push(
                "NCPW_RUNNER_TIMEOUT_SECS is 0. Set a positive runner timeout.".to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            work_dir: self.work_dir.clone(),
            runner_timeout: Duration::from_secs(self.runner_timeout_secs),
        }
    }

    pub fn runner(&self) -> PlaywrightRunner {
        PlaywrightRunner::new(self.runner_program.clone(), self.runner_args.clone())
    }

    pub fn cleanup_config(&self) -> CleanupConfig {
        CleanupConfig {
            work_dir: self.work_dir.clone(),
            retention_hours: self.workspace_retention_hours,
            interval_secs: self.cleanup_interval_secs,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
