//! Typed views over raw graph nodes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{GraphError, Label, Node, NodeId, Properties};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientNode {
    #[serde(default)]
    pub id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeNode {
    #[serde(default)]
    pub id: NodeId,
    pub name: String,
    pub url: String,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub cuisine_type: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Payload carried by both edges of a CONTAINS/PART_OF pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeProps {
    pub quantity: String,
    pub measure: String,
}

impl IngredientNode {
    pub const NAME_KEY: &'static str = "name";

    pub fn from_node(node: &Node) -> Result<Self, GraphError> {
        let mut ingredient: Self = decode(node, Label::Ingredient)?;
        ingredient.id = node.id;
        Ok(ingredient)
    }

    pub fn to_properties(&self) -> Properties {
        encode(self)
    }
}

impl RecipeNode {
    pub const NAME_KEY: &'static str = "name";
    pub const URL_KEY: &'static str = "url";

    pub fn from_node(node: &Node) -> Result<Self, GraphError> {
        let mut recipe: Self = decode(node, Label::Recipe)?;
        recipe.id = node.id;
        Ok(recipe)
    }

    pub fn to_properties(&self) -> Properties {
        encode(self)
    }
}

impl EdgeProps {
    pub fn new(quantity: impl Into<String>, measure: impl Into<String>) -> Self {
        Self {
            quantity: quantity.into(),
            measure: measure.into(),
        }
    }

    pub fn from_properties(properties: &Properties) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(properties.clone())).ok()
    }

    pub fn to_properties(&self) -> Properties {
        encode(self)
    }
}

fn decode<T: DeserializeOwned>(node: &Node, expected: Label) -> Result<T, GraphError> {
    let invalid = |reason: String| GraphError::InvalidRecord {
        label: expected,
        id: node.id,
        reason,
    };

    if node.label != expected {
        return Err(invalid(format!("node is labelled {}", node.label)));
    }

    serde_json::from_value(serde_json::Value::Object(node.properties.clone()))
        .map_err(|err| invalid(err.to_string()))
}

/// Properties of a record; the id is owned by the store and never stored.
fn encode<T: Serialize>(value: &T) -> Properties {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.remove("id");
            map
        }
        _ => Properties::new(),
    }
}
