//! Pipeline configuration
//!
//! Settings and rule tables are read from TOML. The compiled-in
//! `config/rules.toml` is the baseline; a file at
//! `~/.local/share/spendsense/config/rules.toml` (or an explicit path)
//! replaces it. Sections missing from an override fall back to built-in
//! defaults, not to the embedded file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fuzzy::DEFAULT_THRESHOLD;
use crate::resolver::FallbackChain;
use crate::rules::{CategoryAlias, MerchantRule, RuleTable};

/// Embedded default rules (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/rules.toml");

pub const DEFAULT_TRANSFERS_CATEGORY: &str = "Transfers";
pub const DEFAULT_FALLBACK_CATEGORY: &str = "Miscellaneous";

/// Everything the categorization pipeline needs besides user data
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum fuzzy score for a remark to match a category
    pub fuzzy_threshold: u8,
    /// Category assigned on a transfer keyword hit
    pub transfers_category: String,
    /// Category assigned when the full chain finds nothing
    pub default_category: String,
    /// Chain used by single-transaction create and update
    pub single_create_fallback: FallbackChain,
    pub rules: RuleTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_THRESHOLD,
            transfers_category: DEFAULT_TRANSFERS_CATEGORY.to_string(),
            default_category: DEFAULT_FALLBACK_CATEGORY.to_string(),
            single_create_fallback: FallbackChain::RemarkOnly,
            rules: RuleTable::default(),
        }
    }
}

impl PipelineConfig {
    /// The configuration compiled into the binary
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }

    /// Load configuration (explicit path, then user override, then embedded)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            debug!("Loaded pipeline config from {}", path.display());
            return parse_config(&content);
        }

        if let Some(default_path) = default_config_path() {
            if default_path.exists() {
                let content = fs::read_to_string(&default_path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", default_path.display(), e))
                })?;
                debug!("Loaded pipeline config from {}", default_path.display());
                return parse_config(&content);
            }
        }

        Self::embedded()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }
}

/// Get the default config path (~/.local/share/spendsense/config/rules.toml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendsense").join("config").join("rules.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    matching: Option<RawMatching>,
    fallback: Option<RawFallback>,
    aliases: Option<BTreeMap<String, Vec<String>>>,
    transfers: Option<RawTransfers>,
    merchant_rules: Option<Vec<MerchantRule>>,
}

#[derive(Debug, Deserialize)]
struct RawMatching {
    fuzzy_threshold: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RawFallback {
    transfers_category: Option<String>,
    default_category: Option<String>,
    single_create_fallback: Option<FallbackChain>,
}

#[derive(Debug, Deserialize)]
struct RawTransfers {
    keywords: Vec<String>,
}

fn parse_config(content: &str) -> Result<PipelineConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = PipelineConfig::default();

    if let Some(matching) = raw.matching {
        if let Some(threshold) = matching.fuzzy_threshold {
            if threshold > 100 {
                return Err(Error::Config(format!(
                    "fuzzy_threshold must be between 0 and 100, got {}",
                    threshold
                )));
            }
            config.fuzzy_threshold = threshold;
        }
    }

    if let Some(fallback) = raw.fallback {
        if let Some(name) = fallback.transfers_category {
            config.transfers_category = name;
        }
        if let Some(name) = fallback.default_category {
            config.default_category = name;
        }
        if let Some(chain) = fallback.single_create_fallback {
            config.single_create_fallback = chain;
        }
    }

    let aliases = raw
        .aliases
        .unwrap_or_default()
        .into_iter()
        .map(|(canonical, aliases)| CategoryAlias { canonical, aliases })
        .collect();

    config.rules = RuleTable::new(
        raw.transfers.map(|t| t.keywords).unwrap_or_default(),
        raw.merchant_rules.unwrap_or_default(),
        aliases,
    );

    Ok(config)
}
