//! Fuzzy matching of free-text remarks against category labels
//!
//! Scores follow the familiar 0-100 "fuzzy ratio" scale: the similarity of two
//! strings is `2 * LCS / (len_a + len_b)`, i.e. one minus the normalized
//! insert/delete edit distance. The matcher takes the better of the plain ratio
//! and the ratio over alphabetically sorted tokens, so "card fee" and
//! "fee card" match perfectly.

/// Score at or above which a match is accepted
pub const DEFAULT_THRESHOLD: u8 = 85;

/// Best candidate for a query
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a> {
    pub label: &'a str,
    pub category_id: i64,
    pub score: u8,
}

/// Scores queries against an ordered candidate list
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    threshold: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(100),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Whether a score clears the confidence threshold
    pub fn accepts(&self, score: u8) -> bool {
        score >= self.threshold
    }

    /// Highest-scoring candidate, regardless of threshold
    ///
    /// Ties keep the earliest candidate. Returns `None` only for an empty
    /// candidate list.
    pub fn best<'a>(&self, query: &str, candidates: &'a [(String, i64)]) -> Option<FuzzyMatch<'a>> {
        let mut best: Option<FuzzyMatch<'a>> = None;

        for (label, category_id) in candidates {
            let score = score(query, label);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    label: label.as_str(),
                    category_id: *category_id,
                    score,
                });
            }
        }

        best
    }

    /// Best candidate if it clears the threshold
    pub fn find<'a>(&self, query: &str, candidates: &'a [(String, i64)]) -> Option<FuzzyMatch<'a>> {
        self.best(query, candidates)
            .filter(|m| self.accepts(m.score))
    }
}

/// Similarity of two strings in [0, 100]
pub fn score(a: &str, b: &str) -> u8 {
    let a = normalize(a);
    let b = normalize(b);
    ratio(&a, &b).max(token_sort_ratio(&a, &b))
}

/// Lowercase, turn punctuation into spaces and collapse whitespace
fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Indel similarity of two already-normalized strings
fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let total = (a.len() + b.len()) as f64;
    let common = longest_common_subsequence(&a, &b) as f64;
    (200.0 * common / total).round() as u8
}

fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(labels: &[(&str, i64)]) -> Vec<(String, i64)> {
        labels.iter().map(|(l, id)| (l.to_string(), *id)).collect()
    }

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(score("food", "food"), 100);
        assert_eq!(score("  Food ", "food"), 100);
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert_eq!(score("xyz", "food"), 0);
    }

    #[test]
    fn test_one_letter_misspelling() {
        // LCS 3 over 7 characters -> 85.7
        assert_eq!(score("fod", "food"), 86);
    }

    #[test]
    fn test_token_order_does_not_matter() {
        assert_eq!(score("wellness health", "health wellness"), 100);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(score("", "food"), 0);
        assert_eq!(score("///", "food"), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        let matcher = FuzzyMatcher::default();

        // 11 common characters over 26 -> 84.6, rounds to 85
        assert_eq!(score("abcdefghijklm", "abcdefghijkxy"), 85);
        let exact = candidates(&[("abcdefghijkxy", 1)]);
        assert!(matcher.find("abcdefghijklm", &exact).is_some());

        // 8 common characters over 19 -> 84.2, rounds to 84
        assert_eq!(score("abcdefghij", "abcdefghz"), 84);
        let below = candidates(&[("abcdefghz", 1)]);
        assert!(matcher.find("abcdefghij", &below).is_none());
        assert_eq!(matcher.best("abcdefghij", &below).unwrap().score, 84);
    }

    #[test]
    fn test_best_picks_highest_score() {
        let matcher = FuzzyMatcher::default();
        let list = candidates(&[("travel", 1), ("food", 2), ("groceries", 3)]);
        let m = matcher.find("fod", &list).unwrap();
        assert_eq!(m.category_id, 2);
        assert_eq!(m.label, "food");
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let matcher = FuzzyMatcher::default();
        let list = candidates(&[("misc", 10), ("misc", 20)]);
        assert_eq!(matcher.find("misc", &list).unwrap().category_id, 10);
    }

    #[test]
    fn test_empty_candidates() {
        let matcher = FuzzyMatcher::default();
        assert!(matcher.best("food", &[]).is_none());
    }

    #[test]
    fn test_custom_threshold() {
        let strict = FuzzyMatcher::new(90);
        let list = candidates(&[("food", 1)]);
        assert!(strict.find("fod", &list).is_none());
        assert!(FuzzyMatcher::new(150).accepts(100));
    }
}
