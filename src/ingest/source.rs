//! Recipe search feed (Edamam recipe search API v2).

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::SourceError;
use crate::config::SourceConfig;
use crate::resolver::IngredientMention;

pub(super) const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// One recipe as returned by a search, before its details are fetched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub cuisine_type: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLine {
    pub food: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub food_category: String,
    #[serde(default, deserialize_with = "quantity_string")]
    pub quantity: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub measure: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl IngredientLine {
    pub fn mention(&self) -> IngredientMention {
        IngredientMention {
            food_name: self.food.clone(),
            category: self.food_category.clone(),
            quantity: self.quantity.clone(),
            measure: self.measure.clone(),
        }
    }
}

/// Hits stay raw so one malformed recipe does not fail the whole page.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    recipe: RecipeRecord,
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Quantities arrive as numbers; `2.0` is kept as "2", `0.5` as "0.5".
fn quantity_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

pub trait RecipeFeed: Send + Sync {
    fn by_cuisine(&self, cuisine: &str) -> Result<Vec<RecipeRecord>, SourceError>;
    fn by_ingredient(&self, ingredient: &str) -> Result<Vec<RecipeRecord>, SourceError>;
}

pub struct EdamamFeed {
    client: reqwest::blocking::Client,
    base_url: url::Url,
    app_id: String,
    app_key: String,
}

impl EdamamFeed {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let (Some(app_id), Some(app_key)) = (config.app_id.clone(), config.app_key.clone()) else {
            return Err(SourceError::MissingCredentials);
        };

        let base_url = url::Url::parse(&config.base_url)
            .map_err(|err| SourceError::InvalidUrl(format!("{}: {err}", config.base_url)))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            app_id,
            app_key,
        })
    }

    fn search(&self, params: &[(&str, &str)]) -> Result<Vec<RecipeRecord>, SourceError> {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("type", "public");
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("app_id", &self.app_id);
            query.append_pair("app_key", &self.app_key);
        }

        log::debug!("searching recipes: {params:?}");

        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = resp.text()?;
        parse_search_response(&body)
    }
}

impl RecipeFeed for EdamamFeed {
    fn by_cuisine(&self, cuisine: &str) -> Result<Vec<RecipeRecord>, SourceError> {
        self.search(&[("cuisineType", cuisine), ("random", "true")])
    }

    fn by_ingredient(&self, ingredient: &str) -> Result<Vec<RecipeRecord>, SourceError> {
        self.search(&[("q", ingredient)])
    }
}

pub fn parse_search_response(body: &str) -> Result<Vec<RecipeRecord>, SourceError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|err| SourceError::InvalidJson(err.to_string()))?;

    let mut recipes = Vec::with_capacity(response.hits.len());
    for (idx, hit) in response.hits.into_iter().enumerate() {
        match serde_json::from_value::<Hit>(hit) {
            Ok(hit) => recipes.push(hit.recipe),
            Err(err) => log::warn!("skipping search hit {idx}: {err}"),
        }
    }

    Ok(recipes)
}
