//! Recipe detail extraction from schema.org `Recipe` JSON-LD.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::source::USER_AGENT_DEFAULT;
use super::SourceError;

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetails {
    pub instructions: Vec<String>,
    /// Minutes
    pub total_time: Option<u32>,
}

pub trait RecipeSource: Send + Sync {
    fn fetch_details(&self, url: &str) -> Result<RecipeDetails, SourceError>;
}

pub struct HttpRecipeSource {
    client: reqwest::blocking::Client,
}

impl HttpRecipeSource {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .timeout(timeout)
            .pool_idle_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl RecipeSource for HttpRecipeSource {
    fn fetch_details(&self, url: &str) -> Result<RecipeDetails, SourceError> {
        log::debug!("{url}: requesting");

        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let html = String::from_utf8_lossy(&resp.bytes()?).to_string();
        parse_recipe_details(&html)
    }
}

static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("valid ld+json selector")
});

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("valid duration regex")
});

pub fn parse_recipe_details(html: &str) -> Result<RecipeDetails, SourceError> {
    let document = Html::parse_document(html);

    for element in document.select(&LD_JSON_SELECTOR) {
        let json: Value = match serde_json::from_str(element.inner_html().trim()) {
            Ok(v) => v,
            Err(err) => {
                log::trace!("skipping invalid ld+json block: {err}");
                continue;
            }
        };

        if let Some(recipe) = find_recipe(&json) {
            let instructions = extract_instructions(recipe)?;
            let total_time = recipe
                .get("totalTime")
                .and_then(|v| v.as_str())
                .and_then(parse_iso_duration_minutes);

            return Ok(RecipeDetails {
                instructions,
                total_time,
            });
        }
    }

    Err(SourceError::NoRecipe)
}

fn is_recipe(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t == "Recipe"),
        _ => false,
    }
}

/// Depth-first search through `@graph` arrays and nested objects.
fn find_recipe(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if is_recipe(json) {
                return Some(json);
            }
            obj.values().find_map(find_recipe)
        }
        Value::Array(items) => items.iter().find_map(find_recipe),
        _ => None,
    }
}

fn step_text(step: &Value) -> Vec<String> {
    match step {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Object(_) => {
            if let Some(text) = step.get("text").and_then(|v| v.as_str()) {
                return vec![text.trim().to_string()];
            }
            match step.get("itemListElement") {
                Some(Value::Array(items)) => items.iter().flat_map(step_text).collect(),
                Some(item) => step_text(item),
                None => vec![],
            }
        }
        Value::Array(items) => items.iter().flat_map(step_text).collect(),
        _ => vec![],
    }
}

fn extract_instructions(recipe: &Value) -> Result<Vec<String>, SourceError> {
    let raw = recipe
        .get("recipeInstructions")
        .ok_or_else(|| SourceError::MissingField("recipeInstructions".to_string()))?;

    let steps: Vec<String> = match raw {
        Value::String(s) => s
            .lines()
            .map(|line| line.trim().to_string())
            .collect(),
        other => step_text(other),
    }
    .into_iter()
    .filter(|step| !step.is_empty())
    .collect();

    if steps.is_empty() {
        return Err(SourceError::MissingField(
            "recipeInstructions (empty)".to_string(),
        ));
    }

    Ok(steps)
}

/// `PT1H30M` -> 90. Seconds are rounded up to the next minute.
pub fn parse_iso_duration_minutes(value: &str) -> Option<u32> {
    let caps = ISO_DURATION.captures(value.trim())?;
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return None;
    }

    let number = |idx: usize| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u32>().ok(),
            None => Some(0),
        }
    };
    let seconds = caps
        .get(4)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let second_minutes = (seconds / 60.0).ceil();
    if second_minutes > u32::MAX as f64 {
        return None;
    }

    // out-of-range values make the duration unusable rather than wrapping
    number(1)?
        .checked_mul(24 * 60)?
        .checked_add(number(2)?.checked_mul(60)?)?
        .checked_add(number(3)?)?
        .checked_add(second_minutes as u32)
}
