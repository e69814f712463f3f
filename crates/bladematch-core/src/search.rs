//! Fuzzy, synonym-aware vehicle search.
//!
//! A query is normalized, expanded through the synonym table into one
//! variant per brand-family member, and then either short-circuited to a
//! brand listing or scored against every catalog row:
//!
//! ```text
//! token score   1.0   haystack contains the token
//!               1.0   4-digit year inside the row's years range
//!               else  best normalized Levenshtein against haystack words
//! row score     mean of token scores, best across variants
//! ```
//!
//! Rows scoring at least `accept_threshold` are matches; rows between
//! `similar_floor` and the threshold are similar.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{PartsCatalog, Vehicle, VehicleKey};
use crate::config::SearchConfig;
use crate::synonyms::SynonymTable;

/// How a [`SearchOutcome`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Empty or whitespace-only query; nothing was searched.
    InvalidQuery,
    /// The query named a brand; `matches` lists its rows in catalog order.
    BrandListing,
    /// General scoring; `matches` and `similar` are ranked.
    Ranked,
}

/// A catalog row with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub vehicle: Vehicle,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub kind: SearchKind,
    pub matches: Vec<Candidate>,
    pub similar: Vec<Candidate>,
}

impl SearchOutcome {
    fn invalid() -> Self {
        Self {
            kind: SearchKind::InvalidQuery,
            matches: Vec::new(),
            similar: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.similar.is_empty()
    }

    /// The single vehicle key among the matches, if there is exactly one.
    #[must_use]
    pub fn sole_match(&self) -> Option<&Vehicle> {
        let first = self.matches.first()?;
        let key = first.vehicle.key();
        self.matches
            .iter()
            .all(|c| c.vehicle.key() == key)
            .then_some(&first.vehicle)
    }

    /// Distinct keys of matches then similar, in display order.
    #[must_use]
    pub fn keys(&self) -> Vec<VehicleKey> {
        let mut seen = HashSet::new();
        self.matches
            .iter()
            .chain(&self.similar)
            .map(|c| c.vehicle.key())
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }
}

/// Query matcher over a shared catalog and synonym table.
#[derive(Clone)]
pub struct SearchEngine {
    catalog: Arc<dyn PartsCatalog>,
    synonyms: Arc<SynonymTable>,
    config: SearchConfig,
}

impl SearchEngine {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn PartsCatalog>,
        synonyms: Arc<SynonymTable>,
        config: SearchConfig,
    ) -> Self {
        Self {
            catalog,
            synonyms,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run a query. Never fails: unusable input yields an empty outcome.
    #[must_use]
    pub fn search(&self, query: &str) -> SearchOutcome {
        let tokens = self.normalize(query);
        if tokens.is_empty() {
            return SearchOutcome::invalid();
        }
        let variants = self.expand(&tokens);
        debug!(
            query = %tokens.join(" "),
            variants = variants.len(),
            "Expanded query"
        );

        let no_digits = !tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit()));
        if tokens.len() <= 2 && no_digits {
            if let Some(listing) = self.brand_listing(&variants) {
                return listing;
            }
        }
        self.ranked(&variants)
    }

    /// Brand-only lookup: exact name or synonym first, then brands containing
    /// the text. Never falls through to model scoring.
    #[must_use]
    pub fn search_brand(&self, brand: &str) -> SearchOutcome {
        let tokens = self.normalize(brand);
        if tokens.is_empty() {
            return SearchOutcome::invalid();
        }
        if let Some(listing) = self.brand_listing(&self.expand(&tokens)) {
            return listing;
        }
        let needle = tokens.join(" ");
        let matches = self.listing(
            self.catalog
                .vehicles()
                .iter()
                .filter(|v| v.brand.to_lowercase().contains(&needle)),
        );
        debug!(brand = %needle, rows = matches.len(), "Brand substring lookup");
        SearchOutcome {
            kind: SearchKind::BrandListing,
            matches,
            similar: Vec::new(),
        }
    }

    /// Lowercase, split on whitespace, clip token count and token length.
    #[must_use]
    pub fn normalize(&self, query: &str) -> Vec<String> {
        query
            .split_whitespace()
            .take(self.config.max_query_tokens)
            .map(|t| t.to_lowercase().chars().take(self.config.max_token_chars).collect())
            .collect()
    }

    /// Replace the first span naming a brand family with every member of
    /// that family. Alias and canonical produce the same variant set.
    fn expand(&self, tokens: &[String]) -> Vec<Vec<String>> {
        let max_span = self.synonyms.max_span().min(tokens.len());
        for start in 0..tokens.len() {
            for len in (1..=max_span.min(tokens.len() - start)).rev() {
                let span = tokens[start..start + len].join(" ");
                let Some(family) = self.synonyms.family(&span) else {
                    continue;
                };
                let mut variants: Vec<Vec<String>> = Vec::with_capacity(family.len());
                for member in family {
                    let mut variant = tokens[..start].to_vec();
                    variant.extend(member.split_whitespace().map(str::to_lowercase));
                    variant.extend_from_slice(&tokens[start + len..]);
                    if !variants.contains(&variant) {
                        variants.push(variant);
                    }
                }
                return variants;
            }
        }
        vec![tokens.to_vec()]
    }

    fn brand_listing(&self, variants: &[Vec<String>]) -> Option<SearchOutcome> {
        let brands: HashSet<String> = variants
            .iter()
            .map(|v| v.join(" "))
            .filter(|name| !self.catalog.brand_rows(name).is_empty())
            .collect();
        if brands.is_empty() {
            return None;
        }
        let matches = self.listing(
            self.catalog
                .vehicles()
                .iter()
                .filter(|v| brands.contains(&v.brand.trim().to_lowercase())),
        );
        debug!(brands = brands.len(), rows = matches.len(), "Brand listing");
        Some(SearchOutcome {
            kind: SearchKind::BrandListing,
            matches,
            similar: Vec::new(),
        })
    }

    /// One candidate per distinct key, first row wins, capped at
    /// `max_results` distinct keys.
    fn listing<'a>(&self, rows: impl Iterator<Item = &'a Vehicle>) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        rows.filter(|v| seen.insert(v.key()))
            .take(self.config.max_results)
            .map(|v| Candidate {
                vehicle: v.clone(),
                score: 1.0,
            })
            .collect()
    }

    fn ranked(&self, variants: &[Vec<String>]) -> SearchOutcome {
        // key -> (best score, first catalog index)
        let mut best: HashMap<VehicleKey, (f64, usize)> = HashMap::new();
        let vehicles = self.catalog.vehicles();

        for (idx, vehicle) in vehicles.iter().enumerate() {
            let key = vehicle.key();
            if best.contains_key(&key) {
                continue;
            }
            let haystack =
                format!("{} {} {}", vehicle.brand, vehicle.model, vehicle.years).to_lowercase();
            let years = YearRange::parse(&vehicle.years);
            let score = variants
                .iter()
                .map(|variant| score_tokens(variant, &haystack, years))
                .fold(0.0_f64, f64::max);
            if score >= self.config.similar_floor {
                best.insert(key, (score, idx));
            }
        }

        let mut ranked: Vec<(f64, usize)> = best.into_values().collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let (exact, near): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .partition(|(score, _)| *score >= self.config.accept_threshold);
        let to_candidates = |rows: Vec<(f64, usize)>| -> Vec<Candidate> {
            rows.into_iter()
                .take(self.config.max_results)
                .map(|(score, idx)| Candidate {
                    vehicle: vehicles[idx].clone(),
                    score,
                })
                .collect()
        };
        let outcome = SearchOutcome {
            kind: SearchKind::Ranked,
            matches: to_candidates(exact),
            similar: to_candidates(near),
        };
        debug!(
            matches = outcome.matches.len(),
            similar = outcome.similar.len(),
            "Ranked search"
        );
        outcome
    }
}

fn score_tokens(tokens: &[String], haystack: &str, years: Option<YearRange>) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let words: Vec<&str> = haystack.split_whitespace().collect();
    let total: f64 = tokens
        .iter()
        .map(|token| score_token(token, haystack, &words, years))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let count = tokens.len() as f64;
    total / count
}

fn score_token(token: &str, haystack: &str, words: &[&str], years: Option<YearRange>) -> f64 {
    if haystack.contains(token) {
        return 1.0;
    }
    if let (Some(range), Some(year)) = (years, parse_year(token)) {
        if range.contains(year) {
            return 1.0;
        }
    }
    words
        .iter()
        .map(|word| strsim::normalized_levenshtein(token, word))
        .fold(0.0_f64, f64::max)
}

fn parse_year(token: &str) -> Option<u32> {
    (token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()))
        .then(|| token.parse().ok())
        .flatten()
}

/// Inclusive production-years range parsed from labels such as
/// `2017-2020`, `2019-` (open-ended) or `2012`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub from: u32,
    pub to: u32,
}

impl YearRange {
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let years: Vec<u32> = label
            .split(|c: char| !c.is_ascii_digit())
            .filter_map(parse_year)
            .collect();
        let trimmed = label.trim();
        match years.as_slice() {
            [] => None,
            [only] if trimmed.ends_with('-') => Some(Self {
                from: *only,
                to: u32::MAX,
            }),
            [only] if trimmed.starts_with('-') => Some(Self { from: 0, to: *only }),
            [only] => Some(Self {
                from: *only,
                to: *only,
            }),
            [first, .., last] => Some(Self {
                from: (*first).min(*last),
                to: (*first).max(*last),
            }),
        }
    }

    #[must_use]
    pub fn contains(self, year: u32) -> bool {
        (self.from..=self.to).contains(&year)
    }
}
