use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub(crate) struct Config {
    /// Column checked for uniqueness by the cleaning validation step.
    pub(crate) id_column: String,
    /// Directory chart images and simulation plots are written to.
    pub(crate) chart_dir: String,
    /// Daily risk-free rate used for Sharpe ratios.
    pub(crate) risk_free_rate: f64,
    /// Base URL of the daily-quotes CSV endpoint.
    pub(crate) quote_base_url: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            id_column: "id".to_string(),
            chart_dir: "./charts".to_string(),
            risk_free_rate: 0.0005,
            quote_base_url: "https://stooq.com/q/d/l/".to_string(),
        }
    }
}

impl Config {
    pub(crate) fn load_from_file(file_path: &str) -> anyhow::Result<Config> {
        let path = Path::new(file_path);
        if path.exists() && path.is_file() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Unable to read config file {}", file_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Unable to parse config file {}", file_path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_from_file("/no/such/fintools.toml").unwrap();
        assert_eq!(config.id_column, "id");
        assert_eq!(config.risk_free_rate, 0.0005);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join("fintools_config_test.toml");
        std::fs::write(&path, "id_column = \"transaction_id\"\n").unwrap();
        let config = Config::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.id_column, "transaction_id");
        assert_eq!(config.chart_dir, "./charts");
    }
}
