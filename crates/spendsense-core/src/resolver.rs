//! Category and merchant inference for a single transaction description
//!
//! Resolution is a short-circuiting chain:
//!
//! 1. **Remark** - a `/.../` hint in the description, fuzzy matched against the
//!    user's categories and their aliases. An unmatched remark becomes a
//!    new-category signal.
//! 2. **Transfer** - a payee name from the transfer keyword list selects the
//!    transfers category.
//! 3. **Merchant rule** - the first keyword rule that names a merchant or a
//!    category the user has.
//! 4. **Default** - the fallback category.
//!
//! Tiers 2-4 only run for [`FallbackChain::Full`]. The resolver never writes
//! anything; callers decide what to do with the new-category signal.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fuzzy::FuzzyMatcher;
use crate::models::{Category, Merchant};
use crate::rules::RuleTable;

/// How far resolution falls back after the remark tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackChain {
    /// Remark and fuzzy match only
    RemarkOnly,
    /// Remark, transfer keywords, merchant rules, default category
    Full,
}

/// Which tier assigned the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    Remark,
    Transfer,
    MerchantRule,
    Default,
    Unresolved,
}

impl ResolutionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remark => "remark",
            Self::Transfer => "transfer",
            Self::MerchantRule => "merchant_rule",
            Self::Default => "default",
            Self::Unresolved => "unresolved",
        }
    }
}

impl std::fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of resolving one description
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub category_id: Option<i64>,
    pub merchant_id: Option<i64>,
    /// Title-cased remark that matched no category
    pub new_category: Option<String>,
    pub rule: ResolutionRule,
}

/// A user's categories and merchants, indexed for resolution
///
/// Built once per batch (or per single operation) and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    candidates: Vec<(String, i64)>,
    category_by_name: HashMap<String, i64>,
    merchant_by_name: HashMap<String, i64>,
}

impl ReferenceData {
    pub fn new(categories: &[Category], merchants: &[Merchant], rules: &RuleTable) -> Self {
        let mut category_by_name = HashMap::new();
        for category in categories {
            category_by_name
                .entry(category.name.trim().to_lowercase())
                .or_insert(category.id);
        }

        let mut merchant_by_name = HashMap::new();
        for merchant in merchants {
            merchant_by_name
                .entry(merchant.name.clone())
                .or_insert(merchant.id);
        }

        Self {
            candidates: rules.candidates(categories),
            category_by_name,
            merchant_by_name,
        }
    }

    /// Case-insensitive category lookup
    pub fn category_id(&self, name: &str) -> Option<i64> {
        self.category_by_name
            .get(&name.trim().to_lowercase())
            .copied()
    }

    /// Exact merchant lookup
    pub fn merchant_id(&self, name: &str) -> Option<i64> {
        self.merchant_by_name.get(name).copied()
    }

    pub fn candidates(&self) -> &[(String, i64)] {
        &self.candidates
    }
}

pub struct CategoryResolver {
    matcher: FuzzyMatcher,
    rules: RuleTable,
    transfers_category: String,
    default_category: String,
    remark_re: Regex,
}

impl CategoryResolver {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            matcher: FuzzyMatcher::new(config.fuzzy_threshold),
            rules: config.rules.clone(),
            transfers_category: config.transfers_category.clone(),
            default_category: config.default_category.clone(),
            remark_re: Regex::new(r"/([^/]+)/")?,
        })
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Index a user's categories and merchants for this resolver's rules
    pub fn reference_data(&self, categories: &[Category], merchants: &[Merchant]) -> ReferenceData {
        ReferenceData::new(categories, merchants, &self.rules)
    }

    /// Lowercased, trimmed remark from the first `/.../` in a description
    pub fn extract_remark(&self, description: &str) -> Option<String> {
        self.remark_re
            .captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|r| !r.is_empty())
    }

    pub fn resolve(&self, description: &str, data: &ReferenceData, chain: FallbackChain) -> Resolution {
        let mut resolution = Resolution {
            category_id: None,
            merchant_id: None,
            new_category: None,
            rule: ResolutionRule::Unresolved,
        };

        if let Some(remark) = self.extract_remark(description) {
            match self.matcher.find(&remark, data.candidates()) {
                Some(m) => {
                    debug!(remark = %remark, label = m.label, score = m.score, "Remark matched");
                    resolution.category_id = Some(m.category_id);
                    resolution.rule = ResolutionRule::Remark;
                    return resolution;
                }
                None => {
                    let name = title_case(&remark);
                    debug!(remark = %remark, "Remark matched no category, flagging {}", name);
                    resolution.new_category = Some(name);
                }
            }
        }

        if chain == FallbackChain::RemarkOnly {
            return resolution;
        }

        let lower = description.to_lowercase();

        if let Some(keyword) = self.rules.transfer_keyword(&lower) {
            debug!(keyword, "Transfer keyword hit");
            if let Some(id) = data.category_id(&self.transfers_category) {
                resolution.category_id = Some(id);
                resolution.rule = ResolutionRule::Transfer;
            }
        } else {
            for rule in self.rules.matching_rules(&lower) {
                let merchant_id = data.merchant_id(&rule.merchant);
                let category_id = data.category_id(&rule.category);
                if merchant_id.is_none() && category_id.is_none() {
                    continue;
                }

                debug!(keyword = %rule.keyword, ?merchant_id, ?category_id, "Merchant rule hit");
                resolution.merchant_id = merchant_id;
                if category_id.is_some() {
                    resolution.category_id = category_id;
                    resolution.rule = ResolutionRule::MerchantRule;
                }
                break;
            }
        }

        if resolution.category_id.is_none() {
            if let Some(id) = data.category_id(&self.default_category) {
                resolution.category_id = Some(id);
                resolution.rule = ResolutionRule::Default;
            }
        }

        resolution
    }
}

/// Capitalize the first letter of every word, lowercasing the rest
///
/// A word starts after any character that is not a letter, so "health &
/// wellness" becomes "Health & Wellness" and "o'neil" becomes "O'Neil".
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
