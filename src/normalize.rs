//! Ingredient name normalization.
//!
//! Turns a free-text ingredient mention into its canonical lookup key:
//! 1. Lowercase
//! 2. Split on whitespace
//! 3. Lemmatize every token
//! 4. Rejoin with single spaces

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Reduces an inflected token to its base form.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> String;
}

/// Canonical ingredient name: lowercase, lemmatized, single-space separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NormalizedName(String);

impl NormalizedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whitespace tokens of the name, in order.
    pub fn tokens(&self) -> Vec<&str> {
        self.0.split_whitespace().collect()
    }

    /// Distinct tokens in first-seen order, used for substring candidate lookups.
    pub fn words(&self) -> Vec<String> {
        let mut words: Vec<String> = vec![];
        for token in self.0.split_whitespace() {
            if !words.iter().any(|w| w == token) {
                words.push(token.to_string());
            }
        }
        words
    }
}

impl Display for NormalizedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NormalizedName> for String {
    fn from(name: NormalizedName) -> Self {
        name.0
    }
}

#[derive(Clone)]
pub struct Normalizer {
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Arc::new(EnglishLemmatizer))
    }
}

impl Normalizer {
    pub fn new(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self { lemmatizer }
    }

    /// Normalize a raw mention. Never fails; empty input yields an empty name.
    pub fn normalize(&self, raw_name: &str) -> NormalizedName {
        let lowered = raw_name.to_lowercase();
        let tokens: Vec<String> = lowered
            .split_whitespace()
            .map(|token| self.lemmatizer.lemmatize(token))
            .collect();

        NormalizedName(tokens.join(" "))
    }
}

/// Irregular plurals that suffix rules get wrong.
static EXCEPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("leaves", "leaf"),
        ("loaves", "loaf"),
        ("halves", "half"),
        ("knives", "knife"),
        ("calves", "calf"),
        ("wolves", "wolf"),
        ("shelves", "shelf"),
        ("geese", "goose"),
        ("teeth", "tooth"),
        ("feet", "foot"),
        ("mice", "mouse"),
        ("children", "child"),
        ("men", "man"),
        ("women", "woman"),
        ("cookies", "cookie"),
        ("pies", "pie"),
        ("brownies", "brownie"),
        ("calories", "calorie"),
        ("zucchinis", "zucchini"),
        ("shoes", "shoe"),
        ("canoes", "canoe"),
    ])
});

/// Words that end like plurals but are already in base form.
static INVARIANT: &[&str] = &[
    "molasses", "hummus", "couscous", "asparagus", "citrus", "swiss", "brussels", "series",
    "species", "lens", "chives", "grits", "schnapps", "pancreas",
];

/// Rule-based English noun lemmatizer.
///
/// Handles the regular plural suffixes (`-ies`, `-oes`, `-ches`, `-shes`, `-xes`,
/// `-zes`, `-sses`, `-s`) plus a table of irregular forms. Tokens containing
/// non-alphabetic characters pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishLemmatizer;

impl Lemmatizer for EnglishLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        if token.chars().count() <= 3 || !token.chars().all(|c| c.is_alphabetic()) {
            return token.to_string();
        }

        if let Some(base) = EXCEPTIONS.get(token) {
            return base.to_string();
        }

        if INVARIANT.contains(&token) {
            return token.to_string();
        }

        if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
            return token.to_string();
        }

        const RULES: &[(&str, &str)] = &[
            ("sses", "ss"),
            ("ies", "y"),
            ("oes", "o"),
            ("ches", "ch"),
            ("shes", "sh"),
            ("xes", "x"),
            ("zzes", "zz"),
        ];

        for (suffix, replacement) in RULES {
            if let Some(stem) = token.strip_suffix(suffix) {
                return format!("{stem}{replacement}");
            }
        }

        match token.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => token.to_string(),
        }
    }
}
