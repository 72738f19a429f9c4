//! Configuration Management for the incentives service
//!
//! Provides environment-based configuration with validation and secrets management.
//!
//! # Features
//!
//! - Environment-based configs (dev, staging, production)
//! - TOML documents for deployment-specific overrides
//! - Config validation with clear error messages
//! - Secrets (`REDIS_URL`) via environment variables, never serialized
//! - The payment profile table, served through [`ConfiguredPaymentProfiles`]
//!
//! # Example
//!
//! ```no_run
//! use employer_incentives_runtime::config::{Environment, IncentivesConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variable CONFIG_ENV (defaults to dev)
//! let config = IncentivesConfig::from_env()?;
//!
//! // Or load explicitly
//! let config = IncentivesConfig::load(Environment::Production)?;
//!
//! println!("Max retries: {}", config.retry.max_retries);
//! # Ok(())
//! # }
//! ```

use chrono::NaiveDate;
use employer_incentives_core::incentive::{
    EligibilityWindow, IncentivePaymentProfile, IncentiveType, PaymentProfile,
};
use employer_incentives_core::services::{IncentivePaymentProfilesService, ServiceError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),
    /// Invalid environment value
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment (local)
    Development,
    /// Staging environment (pre-production)
    Staging,
    /// Production environment
    Production,
}

impl Environment {
    /// Get environment from string
    ///
    /// # Errors
    ///
    /// Returns error if environment string is invalid
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }

    /// Check if this is production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Retry configuration for lock contention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Cap on the delay between retries, in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl RetryConfig {
    /// Validate retry configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "initial_delay_ms must be > 0".to_string(),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::ValidationError(
                "max_delay_ms must be >= initial_delay_ms".to_string(),
            ));
        }
        if self.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "multiplier must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the retry policy
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .multiplier(self.multiplier)
            .build()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

/// Distributed lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Redis URL (from environment variable for security)
    #[serde(skip)]
    pub redis_url: Option<String>,
    /// Prefix for every lock key in the store
    pub key_prefix: String,
    /// Lease length in milliseconds; a crashed holder's lock expires after this.
    /// Leases are not renewed, so this must exceed the slowest handler run.
    pub ttl_ms: u64,
    /// How long one acquisition waits for a held lock, in milliseconds
    pub acquire_timeout_ms: u64,
    /// Polling interval while waiting, in milliseconds
    pub poll_interval_ms: u64,
}

impl LockConfig {
    /// Validate lock configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "key_prefix cannot be empty".to_string(),
            ));
        }
        if self.ttl_ms == 0 {
            return Err(ConfigError::ValidationError("ttl_ms must be > 0".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.acquire_timeout_ms >= self.ttl_ms {
            return Err(ConfigError::ValidationError(
                "acquire_timeout_ms must be < ttl_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Get lease length as Duration
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Get acquire timeout as Duration
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "employer-incentives:lock:".to_string(),
            ttl_ms: 30_000,
            acquire_timeout_ms: 1_000,
            poll_interval_ms: 50,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics
    pub metrics_enabled: bool,
    /// Metrics port
    pub metrics_port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl ObservabilityConfig {
    /// Validate observability configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "invalid log_level: {}. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_port: 9090,
            log_level: "info".to_string(),
        }
    }
}

/// Eligibility window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    /// First qualifying start date
    pub window_start: NaiveDate,
    /// Last qualifying start date
    pub window_end: NaiveDate,
}

impl EligibilityConfig {
    /// Validate eligibility configuration
    ///
    /// # Errors
    ///
    /// Returns error if the window is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_end < self.window_start {
            return Err(ConfigError::ValidationError(
                "window_end must not be before window_start".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the window
    #[must_use]
    pub const fn window(&self) -> EligibilityWindow {
        EligibilityWindow::new(self.window_start, self.window_end)
    }
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        let window = EligibilityWindow::scheme();
        Self {
            window_start: window.start,
            window_end: window.end,
        }
    }
}

/// Validate the payment profile table
///
/// # Errors
///
/// Returns error unless each age bracket has exactly one profile with
/// non-negative amounts and a second milestone after the first.
pub fn validate_payment_profiles(profiles: &[IncentivePaymentProfile]) -> Result<(), ConfigError> {
    for incentive_type in [
        IncentiveType::UnderTwentyFiveIncentive,
        IncentiveType::TwentyFiveOrOverIncentive,
    ] {
        let count = profiles
            .iter()
            .filter(|p| p.incentive_type == incentive_type)
            .count();
        if count != 1 {
            return Err(ConfigError::ValidationError(format!(
                "expected one payment profile for {incentive_type}, found {count}"
            )));
        }
    }

    for profile in profiles {
        let [first, second] = &profile.profiles;
        if first.amount.is_sign_negative() || second.amount.is_sign_negative() {
            return Err(ConfigError::ValidationError(format!(
                "payment amounts for {} must not be negative",
                profile.incentive_type
            )));
        }
        if second.days_after_start <= first.days_after_start {
            return Err(ConfigError::ValidationError(format!(
                "second payment for {} must fall after the first",
                profile.incentive_type
            )));
        }
    }
    Ok(())
}

fn default_payment_profiles() -> Vec<IncentivePaymentProfile> {
    vec![
        IncentivePaymentProfile::new(
            IncentiveType::UnderTwentyFiveIncentive,
            PaymentProfile::new(89, Decimal::from(1000)),
            PaymentProfile::new(364, Decimal::from(1000)),
        ),
        IncentivePaymentProfile::new(
            IncentiveType::TwentyFiveOrOverIncentive,
            PaymentProfile::new(89, Decimal::from(750)),
            PaymentProfile::new(364, Decimal::from(750)),
        ),
    ]
}

/// Incentives service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncentivesConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
    /// Lock configuration
    #[serde(default)]
    pub lock: LockConfig,
    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Eligibility window
    #[serde(default)]
    pub eligibility: EligibilityConfig,
    /// Payment profile table
    #[serde(default = "default_payment_profiles")]
    pub payment_profiles: Vec<IncentivePaymentProfile>,
}

impl IncentivesConfig {
    /// Load configuration from environment
    ///
    /// Reads `CONFIG_ENV` environment variable (defaults to "development")
    ///
    /// # Errors
    ///
    /// Returns error if configuration cannot be loaded or is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = std::env::var("CONFIG_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::parse(&env_str)?;
        Self::load(environment)
    }

    /// Load configuration for specific environment
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid or secrets are missing
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        let mut config = Self::defaults_for(environment);
        config.load_secrets()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML document
    ///
    /// Omitted sections fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the document does not parse, is invalid, or secrets are missing
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(document).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.load_secrets()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment-specific overrides, before secrets
    #[must_use]
    pub fn defaults_for(environment: Environment) -> Self {
        let mut config = Self {
            environment,
            ..Self::default()
        };

        match environment {
            Environment::Development => {
                config.observability.log_level = "debug".to_string();
                config.observability.metrics_enabled = false;
            }
            Environment::Staging => {
                config.observability.log_level = "info".to_string();
            }
            Environment::Production => {
                config.observability.log_level = "warn".to_string();
                config.retry.max_retries = 5; // Absorb more contention in prod
                config.lock.ttl_ms = 60_000;
            }
        }

        config
    }

    /// Load secrets from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if required secrets are missing
    fn load_secrets(&mut self) -> Result<(), ConfigError> {
        // Redis URL (required in staging/prod)
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.lock.redis_url = Some(url);
        } else if !self.environment.is_development() {
            return Err(ConfigError::EnvVarNotSet("REDIS_URL".to_string()));
        }
        Ok(())
    }

    /// Validate entire configuration
    ///
    /// # Errors
    ///
    /// Returns error if any configuration section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.lock.validate()?;
        self.observability.validate()?;
        self.eligibility.validate()?;
        validate_payment_profiles(&self.payment_profiles)?;
        Ok(())
    }

    /// Check if running in production
    #[must_use]
    pub const fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

impl Default for IncentivesConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            retry: RetryConfig::default(),
            lock: LockConfig::default(),
            observability: ObservabilityConfig::default(),
            eligibility: EligibilityConfig::default(),
            payment_profiles: default_payment_profiles(),
        }
    }
}

/// Serves the payment profile table from configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredPaymentProfiles {
    profiles: Vec<IncentivePaymentProfile>,
}

impl ConfiguredPaymentProfiles {
    /// Creates the service from a profile table
    #[must_use]
    pub const fn new(profiles: Vec<IncentivePaymentProfile>) -> Self {
        Self { profiles }
    }

    /// Creates the service from loaded configuration
    #[must_use]
    pub fn from_config(config: &IncentivesConfig) -> Self {
        Self::new(config.payment_profiles.clone())
    }
}

impl IncentivePaymentProfilesService for ConfiguredPaymentProfiles {
    async fn get(&self) -> Result<Vec<IncentivePaymentProfile>, ServiceError> {
        Ok(self.profiles.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("dev").unwrap(), Environment::Development);
        assert_eq!(
            Environment::parse("development").unwrap(),
            Environment::Development
        );
        assert_eq!(Environment::parse("staging").unwrap(), Environment::Staging);
        assert_eq!(Environment::parse("prod").unwrap(), Environment::Production);
        assert!(Environment::parse("invalid").is_err());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Staging.to_string(), "staging");
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn test_retry_config_validation() {
        let mut config = RetryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy().max_retries, 3);

        config.multiplier = 0.5;
        assert!(config.validate().is_err());

        config.multiplier = 2.0;
        config.max_delay_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lock_config_validation() {
        let mut config = LockConfig::default();
        assert!(config.validate().is_ok());

        config.acquire_timeout_ms = config.ttl_ms;
        assert!(config.validate().is_err());

        config.acquire_timeout_ms = 100;
        config.key_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_observability_config_validation() {
        let mut config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_eligibility_defaults_to_the_scheme_window() {
        let config = EligibilityConfig::default();
        assert_eq!(config.window(), EligibilityWindow::scheme());

        let reversed = EligibilityConfig {
            window_start: config.window_end,
            window_end: config.window_start,
        };
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn test_payment_profiles_need_one_entry_per_bracket() {
        let mut profiles = default_payment_profiles();
        assert!(validate_payment_profiles(&profiles).is_ok());

        profiles.pop();
        assert!(validate_payment_profiles(&profiles).is_err());
    }

    #[test]
    fn test_development_defaults() {
        let config = IncentivesConfig::load(Environment::Development).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_production_load() {
        let config = IncentivesConfig::load(Environment::Production);
        // Fails if REDIS_URL is not set, which is expected
        if let Ok(config) = config {
            assert_eq!(config.observability.log_level, "warn");
            assert_eq!(config.retry.max_retries, 5);
            assert!(config.lock.redis_url.is_some());
        }
    }

    #[test]
    fn test_toml_overrides_sections() {
        let config = IncentivesConfig::from_toml(
            r#"
            environment = "development"

            [retry]
            max_retries = 7
            initial_delay_ms = 20
            max_delay_ms = 500
            multiplier = 1.5

            [eligibility]
            window_start = "2021-04-01"
            window_end = "2022-01-31"
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(
            config.eligibility.window().start,
            NaiveDate::from_ymd_opt(2021, 4, 1).unwrap()
        );
        assert_eq!(config.lock.key_prefix, LockConfig::default().key_prefix);
        assert_eq!(config.payment_profiles.len(), 2);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        assert!(matches!(
            IncentivesConfig::from_toml("environment = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_configured_profiles_serve_the_table() {
        let service = ConfiguredPaymentProfiles::from_config(&IncentivesConfig::default());
        let profiles = service.get().await.unwrap();
        assert_eq!(profiles.len(), 2);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::EnvVarNotSet("REDIS_URL".to_string());
        assert_eq!(err.to_string(), "Environment variable not set: REDIS_URL");
    }
}
