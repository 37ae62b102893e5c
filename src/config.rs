use crate::models::ColumnSchema;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub market: MarketSettings,
    #[serde(default)]
    pub columns: ColumnSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MarketSettings {
    /// Characteristics per applicant, between 2 and 4
    #[serde(default = "default_char_number")]
    #[validate(range(min = 2, max = 4))]
    pub a_char_number: usize,
    /// Characteristics per reviewer, between 2 and 4
    #[serde(default = "default_char_number")]
    #[validate(range(min = 2, max = 4))]
    pub b_char_number: usize,
    /// Run the biased shadow matching alongside the unbiased one
    #[serde(default)]
    pub bias: bool,
    /// Rows to synthesize when no dataset is supplied
    #[serde(default = "default_market_size")]
    #[validate(range(min = 1))]
    pub market_size: usize,
    /// Seed for synthetic data generation only; matching itself is
    /// deterministic for fixed inputs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            a_char_number: default_char_number(),
            b_char_number: default_char_number(),
            bias: false,
            market_size: default_market_size(),
            seed: None,
        }
    }
}

fn default_char_number() -> usize { 2 }
fn default_market_size() -> usize { 200 }

/// Configurable names for the input table columns. Resolved once at
/// ingestion into a fixed `ColumnSchema`; nothing downstream ever sees
/// these raw names.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSettings {
    #[serde(default = "default_a_char_prefix")]
    pub a_char_prefix: String,
    #[serde(default = "default_a_mrs_prefix")]
    pub a_mrs_prefix: String,
    #[serde(default = "default_b_char_prefix")]
    pub b_char_prefix: String,
    #[serde(default = "default_b_mrs_prefix")]
    pub b_mrs_prefix: String,
    #[serde(default = "default_a_bias_attribute")]
    pub a_bias_attribute: String,
    #[serde(default = "default_b_bias_weight")]
    pub b_bias_weight: String,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            a_char_prefix: default_a_char_prefix(),
            a_mrs_prefix: default_a_mrs_prefix(),
            b_char_prefix: default_b_char_prefix(),
            b_mrs_prefix: default_b_mrs_prefix(),
            a_bias_attribute: default_a_bias_attribute(),
            b_bias_weight: default_b_bias_weight(),
        }
    }
}

fn default_a_char_prefix() -> String { "A_char".to_string() }
fn default_a_mrs_prefix() -> String { "A_mrs".to_string() }
fn default_b_char_prefix() -> String { "B_char".to_string() }
fn default_b_mrs_prefix() -> String { "B_mrs".to_string() }
fn default_a_bias_attribute() -> String { "A_bias_char".to_string() }
fn default_b_bias_weight() -> String { "B_bias_mrs".to_string() }

impl ColumnSettings {
    /// Expand the prefixes into the concrete column names for the
    /// configured characteristic counts.
    ///
    /// Characteristics are numbered from 1 (`A_char_1`), MRS columns by the
    /// counterpart characteristic they convert (`A_mrs_12` trades the
    /// counterpart's second characteristic against its first). Each side's
    /// MRS count follows the counterpart side's characteristic count.
    pub fn resolve(&self, a_char_number: usize, b_char_number: usize, bias: bool) -> ColumnSchema {
        ColumnSchema {
            a_chars: indexed(&self.a_char_prefix, a_char_number),
            a_mrs: mrs_indexed(&self.a_mrs_prefix, b_char_number),
            b_chars: indexed(&self.b_char_prefix, b_char_number),
            b_mrs: mrs_indexed(&self.b_mrs_prefix, a_char_number),
            a_bias_attribute: bias.then(|| self.a_bias_attribute.clone()),
            b_bias_weight: bias.then(|| self.b_bias_weight.clone()),
        }
    }
}

fn indexed(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|k| format!("{}_{}", prefix, k)).collect()
}

fn mrs_indexed(prefix: &str, counterpart_chars: usize) -> Vec<String> {
    (2..=counterpart_chars)
        .map(|k| format!("{}_1{}", prefix, k))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    /// Namespacing prefix for output columns and files
    #[serde(default = "default_spec_name")]
    pub spec_name: String,
    /// Include the matched-counterpart characteristic columns
    #[serde(default)]
    pub dap_allocation_vars: bool,
    /// Emit the standardized columns chart rendering consumes
    #[serde(default)]
    pub graphs: bool,
    /// Write the output, log and summary files
    #[serde(default = "default_true")]
    pub save_files: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            spec_name: default_spec_name(),
            dap_allocation_vars: false,
            graphs: false,
            save_files: default_true(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_spec_name() -> String { "dap_mrs".to_string() }
fn default_output_dir() -> String { ".".to_string() }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DAP__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. DAP__MARKET__SEED -> market.seed
            .add_source(
                Environment::with_prefix("DAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("DAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// The column schema implied by the configured names and counts
    pub fn column_schema(&self) -> ColumnSchema {
        self.columns.resolve(
            self.market.a_char_number,
            self.market.b_char_number,
            self.market.bias,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_market_settings() {
        let market = MarketSettings::default();
        assert_eq!(market.a_char_number, 2);
        assert_eq!(market.b_char_number, 2);
        assert_eq!(market.market_size, 200);
        assert!(!market.bias);
        assert_eq!(market.seed, None);
    }

    #[test]
    fn test_default_column_names_two_characteristics() {
        let schema = ColumnSettings::default().resolve(2, 2, false);
        assert_eq!(schema.a_chars, vec!["A_char_1", "A_char_2"]);
        assert_eq!(schema.a_mrs, vec!["A_mrs_12"]);
        assert_eq!(schema.b_chars, vec!["B_char_1", "B_char_2"]);
        assert_eq!(schema.b_mrs, vec!["B_mrs_12"]);
        assert!(schema.a_bias_attribute.is_none());
        assert!(schema.b_bias_weight.is_none());
    }

    #[test]
    fn test_mrs_columns_follow_counterpart_count() {
        let schema = ColumnSettings::default().resolve(2, 4, true);
        assert_eq!(schema.a_chars.len(), 2);
        assert_eq!(schema.b_chars.len(), 4);
        // Applicants rate four reviewer characteristics
        assert_eq!(schema.a_mrs, vec!["A_mrs_12", "A_mrs_13", "A_mrs_14"]);
        // Reviewers rate two applicant characteristics
        assert_eq!(schema.b_mrs, vec!["B_mrs_12"]);
        assert_eq!(schema.a_bias_attribute.as_deref(), Some("A_bias_char"));
        assert_eq!(schema.b_bias_weight.as_deref(), Some("B_bias_mrs"));
    }

    #[test]
    fn test_char_number_range_is_validated() {
        let mut settings = MarketSettings::default();
        settings.a_char_number = 5;
        assert!(settings.validate().is_err());
        settings.a_char_number = 4;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_output_settings() {
        let output = OutputSettings::default();
        assert_eq!(output.spec_name, "dap_mrs");
        assert!(output.save_files);
        assert!(!output.graphs);
        assert!(!output.dap_allocation_vars);
    }
}
