use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::RankSelection;
use crate::error::TaxLookupError;
use crate::ncbi::DEFAULT_TAXDUMP_URL;
use crate::store::DEFAULT_DATA_DIR;

pub const DEFAULT_CONFIG_FILE: &str = "kira-tax.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub taxdump_url: Option<String>,
    #[serde(default)]
    pub column: Option<usize>,
    #[serde(default)]
    pub ranks: Option<String>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<String>,
    pub column: Option<usize>,
    pub ranks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub data_dir: Utf8PathBuf,
    pub taxdump_url: String,
    pub column: usize,
    pub ranks: RankSelection,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `kira-tax.json` from the working directory when it
    /// exists. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&str>) -> Result<Config, TaxLookupError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| TaxLookupError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| TaxLookupError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, TaxLookupError> {
        Self::resolve_config(Self::load(path)?, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, TaxLookupError> {
        let column = overrides.column.or(config.column).unwrap_or(1);
        if column == 0 {
            return Err(TaxLookupError::InvalidColumn(column));
        }

        let ranks = match overrides.ranks.or(config.ranks) {
            Some(value) => value.parse()?,
            None => RankSelection::linnean(),
        };

        let data_dir = overrides
            .data_dir
            .or(config.data_dir)
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            data_dir: Utf8PathBuf::from(data_dir),
            taxdump_url: config
                .taxdump_url
                .unwrap_or_else(|| DEFAULT_TAXDUMP_URL.to_string()),
            column,
            ranks,
        })
    }
}
