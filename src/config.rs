use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::SearchCriteria;
use crate::error::FetchError;
use crate::filter::MetadataFilter;
use crate::metaspace::DEFAULT_ENDPOINT;
use crate::staging::DEFAULT_DOWNLOAD_DIR;

pub const CONFIG_FILE: &str = "metaspace-fetch.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub search: SearchCriteria,
    #[serde(default)]
    pub filter: MetadataFilter,
    #[serde(default)]
    pub molecules: MoleculeEntry,
}

/// Molecule patterns, either a single pattern or a list.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MoleculeEntry {
    Shorthand(String),
    List(Vec<String>),
}

impl Default for MoleculeEntry {
    fn default() -> Self {
        MoleculeEntry::List(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub endpoint: String,
    pub download_dir: Utf8PathBuf,
    pub search: SearchCriteria,
    pub filter: MetadataFilter,
    pub molecules: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `metaspace-fetch.json` in the working directory.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, FetchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(FetchError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FetchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| FetchError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    /// Like [`ConfigLoader::resolve`], but a missing default file yields the
    /// default configuration.
    pub fn resolve_or_default(path: Option<&str>) -> Result<ResolvedConfig, FetchError> {
        match Self::resolve(path) {
            Err(FetchError::MissingConfig) => Ok(ResolvedConfig::default()),
            other => other,
        }
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let molecules = match config.molecules {
            MoleculeEntry::Shorthand(pattern) => vec![pattern],
            MoleculeEntry::List(patterns) => patterns,
        };
        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            endpoint: config
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            download_dir: Utf8PathBuf::from(
                config
                    .download_dir
                    .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.to_string()),
            ),
            search: config.search,
            filter: config.filter,
            molecules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_shorthand() {
        let config: Config = serde_json::from_str(r#"{ "molecules": "C6H12O6" }"#).unwrap();
        let resolved = ConfigLoader::resolve_config(config);
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(resolved.download_dir, Utf8PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        assert_eq!(resolved.molecules, vec!["C6H12O6"]);
        assert!(resolved.filter.is_empty());
    }
}
