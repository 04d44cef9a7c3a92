//! Keyword rule tables used when a description carries no usable remark
//!
//! The table is plain data: transfer keywords (payee names whose payments
//! are person-to-person transfers), keyword -> (merchant, category) rules
//! checked in order, and alternate labels for category names. It is loaded
//! from configuration and handed to the resolver, never mutated afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Maps a description keyword to a canonical merchant and category name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantRule {
    pub keyword: String,
    pub merchant: String,
    pub category: String,
}

/// Alternate labels for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAlias {
    /// Lowercase category name the aliases resolve to
    pub canonical: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    transfer_keywords: Vec<String>,
    merchant_rules: Vec<MerchantRule>,
    aliases: Vec<CategoryAlias>,
}

impl RuleTable {
    /// Build a table, lowercasing every keyword and label
    pub fn new(
        transfer_keywords: Vec<String>,
        merchant_rules: Vec<MerchantRule>,
        aliases: Vec<CategoryAlias>,
    ) -> Self {
        Self {
            transfer_keywords: transfer_keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            merchant_rules: merchant_rules
                .into_iter()
                .map(|r| MerchantRule {
                    keyword: r.keyword.trim().to_lowercase(),
                    ..r
                })
                .filter(|r| !r.keyword.is_empty())
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|a| CategoryAlias {
                    canonical: a.canonical.trim().to_lowercase(),
                    aliases: a
                        .aliases
                        .into_iter()
                        .map(|l| l.trim().to_lowercase())
                        .filter(|l| !l.is_empty())
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn transfer_keywords(&self) -> &[String] {
        &self.transfer_keywords
    }

    pub fn merchant_rules(&self) -> &[MerchantRule] {
        &self.merchant_rules
    }

    pub fn aliases(&self) -> &[CategoryAlias] {
        &self.aliases
    }

    /// First transfer keyword contained in a lowercased description
    pub fn transfer_keyword(&self, description_lower: &str) -> Option<&str> {
        self.transfer_keywords
            .iter()
            .find(|k| description_lower.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Merchant rules whose keyword occurs in a lowercased description, in table order
    pub fn matching_rules<'a>(
        &'a self,
        description_lower: &'a str,
    ) -> impl Iterator<Item = &'a MerchantRule> + 'a {
        self.merchant_rules
            .iter()
            .filter(move |r| description_lower.contains(r.keyword.as_str()))
    }

    /// Fuzzy-match candidates for a user's categories
    ///
    /// Canonical names come first, in the order given, followed by aliases
    /// of categories the user actually has. A label that is already present
    /// keeps its first category.
    pub fn candidates(&self, categories: &[Category]) -> Vec<(String, i64)> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(categories.len());

        for category in categories {
            let label = category.name.trim().to_lowercase();
            if seen.insert(label.clone()) {
                out.push((label, category.id));
            }
        }

        for alias in &self.aliases {
            let Some(&(_, category_id)) = out.iter().find(|(l, _)| *l == alias.canonical) else {
                continue;
            };
            for label in &alias.aliases {
                if seen.insert(label.clone()) {
                    out.push((label.clone(), category_id));
                }
            }
        }

        out
    }

    /// Distinct category names referenced by merchant rules, in table order
    pub fn rule_categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.merchant_rules
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }
}
