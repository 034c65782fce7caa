use std::fmt;

use serde::{Deserialize, Serialize};

/// openHAB item type. Anything the adapter has no mapping for keeps its raw
/// name so it can be echoed back (`Number`, `String`, `Number:Temperature`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemType {
    Switch,
    Dimmer,
    Color,
    Rollershutter,
    Group,
    Other(String),
}

impl ItemType {
    pub fn as_str(&self) -> &str {
        match self {
            ItemType::Switch => "Switch",
            ItemType::Dimmer => "Dimmer",
            ItemType::Color => "Color",
            ItemType::Rollershutter => "Rollershutter",
            ItemType::Group => "Group",
            ItemType::Other(name) => name,
        }
    }
}

impl From<String> for ItemType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Switch" => ItemType::Switch,
            "Dimmer" => ItemType::Dimmer,
            "Color" => ItemType::Color,
            "Rollershutter" => ItemType::Rollershutter,
            "Group" => ItemType::Group,
            _ => ItemType::Other(s),
        }
    }
}

impl From<ItemType> for String {
    fn from(t: ItemType) -> Self {
        match t {
            ItemType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a hub item as returned by `/rest/items`.
///
/// `members` is only populated when a group is fetched on its own; the bulk
/// enumeration leaves it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Item>,
}

impl Item {
    pub fn is_group(&self) -> bool {
        self.item_type == ItemType::Group
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Display name, falling back to the item name for unlabelled items.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Parses the state as a number. `NULL`/`UNDEF` and friends yield `None`.
    /// Finite numeric state; `NULL`, `UNDEF`, `NaN` and infinities give `None`.
    pub fn numeric_state(&self) -> Option<f64> {
        self.state
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
    }
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * (5.0 / 9.0)
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * (9.0 / 5.0) + 32.0
}

/// Maps an openHAB heating/cooling mode state to the Alexa mode name.
/// Numeric codes follow the HomeKit convention; anything else is upper-cased.
pub fn thermostat_mode_label(code: &str) -> String {
    match code {
        "0" => "OFF".to_string(),
        "1" => "HEAT".to_string(),
        "2" => "COOL".to_string(),
        "3" | "heat-cool" => "AUTO".to_string(),
        other => other.to_uppercase(),
    }
}
