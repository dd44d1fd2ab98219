//! Configuration types for the analytics engines and the session store.
//!
//! Both configurations can be built with a fluent builder or deserialized
//! from JSON (e.g. a `--config` file passed to the CLI).

use serde::{Deserialize, Serialize};

/// Default number of histogram bins for numeric distributions.
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Default cap applied to reconciliation samples in preview mode.
pub const DEFAULT_PREVIEW_LIMIT: usize = 100;

/// Tunables shared by the statistics, distribution, outlier and
/// reconciliation engines.
///
/// # Example
///
/// ```rust,ignore
/// use lex_insights::config::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .histogram_bins(30)
///     .iqr_multiplier(3.0)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of equal-width bins for numeric histograms.
    /// Default: 20
    pub histogram_bins: usize,

    /// Number of most frequent values reported in categorical column stats.
    /// Default: 10
    pub top_values_limit: usize,

    /// Number of distinct values reported in a categorical distribution.
    /// Default: 50
    pub categorical_distribution_limit: usize,

    /// Multiplier applied to the IQR when computing outlier fences.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Maximum number of outlier values listed per column.
    /// Default: 100
    pub outlier_sample_limit: usize,

    /// Cap applied to each reconciliation partition in preview mode.
    /// Default: 100
    pub preview_limit: usize,

    /// Number of rows returned as a data sample in a full analysis.
    /// Default: 100
    pub sample_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            top_values_limit: 10,
            categorical_distribution_limit: 50,
            iqr_multiplier: 1.5,
            outlier_sample_limit: 100,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            sample_rows: 100,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.histogram_bins == 0 {
            return Err(ConfigValidationError::ZeroLimit {
                field: "histogram_bins".to_string(),
            });
        }

        if self.preview_limit == 0 {
            return Err(ConfigValidationError::ZeroLimit {
                field: "preview_limit".to_string(),
            });
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(
                self.iqr_multiplier,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': must be at least 1")]
    ZeroLimit { field: String },

    #[error("Invalid IQR multiplier: {0} (must be a finite, non-negative number)")]
    InvalidMultiplier(f64),

    #[error("Invalid session capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    histogram_bins: Option<usize>,
    top_values_limit: Option<usize>,
    categorical_distribution_limit: Option<usize>,
    iqr_multiplier: Option<f64>,
    outlier_sample_limit: Option<usize>,
    preview_limit: Option<usize>,
    sample_rows: Option<usize>,
}

impl AnalysisConfigBuilder {
    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set how many top values categorical stats report.
    pub fn top_values_limit(mut self, limit: usize) -> Self {
        self.top_values_limit = Some(limit);
        self
    }

    /// Set how many distinct values a categorical distribution reports.
    pub fn categorical_distribution_limit(mut self, limit: usize) -> Self {
        self.categorical_distribution_limit = Some(limit);
        self
    }

    /// Set the IQR multiplier for outlier fences.
    ///
    /// # Arguments
    /// * `multiplier` - Usually 1.5 (mild) or 3.0 (extreme outliers)
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Set how many outlier values are listed per column.
    pub fn outlier_sample_limit(mut self, limit: usize) -> Self {
        self.outlier_sample_limit = Some(limit);
        self
    }

    /// Set the reconciliation preview cap.
    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = Some(limit);
        self
    }

    /// Set the number of sample rows in a full analysis.
    pub fn sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let defaults = AnalysisConfig::default();
        let config = AnalysisConfig {
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            top_values_limit: self.top_values_limit.unwrap_or(defaults.top_values_limit),
            categorical_distribution_limit: self
                .categorical_distribution_limit
                .unwrap_or(defaults.categorical_distribution_limit),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            outlier_sample_limit: self
                .outlier_sample_limit
                .unwrap_or(defaults.outlier_sample_limit),
            preview_limit: self.preview_limit.unwrap_or(defaults.preview_limit),
            sample_rows: self.sample_rows.unwrap_or(defaults.sample_rows),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Capacity and expiry policy for the [`SessionStore`](crate::session::SessionStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of live sessions. Inserting beyond this evicts the
    /// oldest session.
    /// Default: 10
    pub capacity: usize,

    /// Idle time in seconds after which a session expires.
    /// `None` disables expiry.
    /// Default: 3600
    pub ttl_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            ttl_secs: Some(3600),
        }
    }
}

impl SessionConfig {
    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.capacity == 0 {
            return Err(ConfigValidationError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.top_values_limit, 10);
        assert_eq!(config.categorical_distribution_limit, 50);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.preview_limit, 100);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = AnalysisConfig::builder().build().unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AnalysisConfig::builder()
            .histogram_bins(5)
            .top_values_limit(3)
            .iqr_multiplier(3.0)
            .preview_limit(10)
            .build()
            .unwrap();

        assert_eq!(config.histogram_bins, 5);
        assert_eq!(config.top_values_limit, 3);
        assert_eq!(config.iqr_multiplier, 3.0);
        assert_eq!(config.preview_limit, 10);
    }

    #[test]
    fn test_validation_zero_bins() {
        let result = AnalysisConfig::builder().histogram_bins(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroLimit { .. }
        ));
    }

    #[test]
    fn test_validation_negative_multiplier() {
        let result = AnalysisConfig::builder().iqr_multiplier(-1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMultiplier(_)
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "histogram_bins": 8, "preview_limit": 25 }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.histogram_bins, 8);
        assert_eq!(config.preview_limit, 25);
        assert_eq!(config.top_values_limit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_validation() {
        assert!(SessionConfig::default().validate().is_ok());
        let config = SessionConfig {
            capacity: 0,
            ttl_secs: None,
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidCapacity(0)
        ));
    }
}
