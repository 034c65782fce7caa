//! Translates the openHAB item list into Alexa discovered appliances.
//!
//! Tags drive everything: each recognised tag on an item yields one appliance
//! whose actions depend on the tag and on the item's type. An item carrying
//! several capability tags is exposed once per tag.

use std::collections::HashSet;

use serde::Serialize;
use tracing::trace;

use crate::types::{Item, ItemType};
use crate::{Error, Result};

pub const MANUFACTURER: &str = "openHAB";
pub const OPENHAB_VERSION: &str = "2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    TurnOn,
    TurnOff,
    IncrementPercentage,
    DecrementPercentage,
    SetPercentage,
    SetColor,
    GetTemperatureReading,
    IncrementTargetTemperature,
    DecrementTargetTemperature,
    SetTargetTemperature,
    GetTargetTemperature,
}

const SWITCH_ACTIONS: &[Action] = &[Action::TurnOn, Action::TurnOff];

const DIMMER_ACTIONS: &[Action] = &[
    Action::IncrementPercentage,
    Action::DecrementPercentage,
    Action::SetPercentage,
    Action::TurnOn,
    Action::TurnOff,
];

const COLOR_ACTIONS: &[Action] = &[
    Action::IncrementPercentage,
    Action::DecrementPercentage,
    Action::SetPercentage,
    Action::TurnOn,
    Action::TurnOff,
    Action::SetColor,
];

const ROLLERSHUTTER_ACTIONS: &[Action] = &[
    Action::SetPercentage,
    Action::IncrementPercentage,
    Action::DecrementPercentage,
];

const SENSOR_ACTIONS: &[Action] = &[Action::GetTemperatureReading];

const THERMOSTAT_ACTIONS: &[Action] = &[
    Action::IncrementTargetTemperature,
    Action::DecrementTargetTemperature,
    Action::SetTargetTemperature,
    Action::GetTargetTemperature,
    Action::GetTemperatureReading,
];

/// Item tags that expose an appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTag {
    Lighting,
    Switchable,
    CurrentTemperature,
    Thermostat,
}

impl CapabilityTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "Lighting" => Some(CapabilityTag::Lighting),
            "Switchable" => Some(CapabilityTag::Switchable),
            "CurrentTemperature" => Some(CapabilityTag::CurrentTemperature),
            "Thermostat" => Some(CapabilityTag::Thermostat),
            _ => None,
        }
    }

    fn reports_temperature(&self) -> bool {
        matches!(self, CapabilityTag::CurrentTemperature | CapabilityTag::Thermostat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureFormat {
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceDetails {
    pub item_type: String,
    pub item_tag: String,
    pub openhab_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_format: Option<TemperatureFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub appliance_id: String,
    pub manufacturer_name: &'static str,
    pub model_name: String,
    pub version: &'static str,
    pub friendly_name: String,
    pub friendly_description: String,
    pub is_reachable: bool,
    pub actions: Vec<Action>,
    pub additional_appliance_details: ApplianceDetails,
}

/// Builds the discovered appliance list, in item order then tag order.
///
/// An empty enumeration is treated as a hub failure rather than "no devices".
pub fn discover(items: &[Item]) -> Result<Vec<Device>> {
    if items.is_empty() {
        return Err(Error::NoItems);
    }

    let thermostat_groups: HashSet<&str> = items
        .iter()
        .filter(|item| item.is_group() && item.has_tag("Thermostat"))
        .map(|item| item.name.as_str())
        .collect();

    let mut devices = Vec::new();
    for item in items {
        for raw_tag in &item.tags {
            let Some(tag) = CapabilityTag::parse(raw_tag) else {
                continue;
            };
            let Some(actions) = actions_for(item, tag, &thermostat_groups) else {
                trace!(item = %item.name, tag = %raw_tag, "tag yields no actions");
                continue;
            };
            devices.push(device(item, raw_tag, tag, actions));
        }
    }
    trace!(count = devices.len(), "discovered appliances");
    Ok(devices)
}

fn actions_for(
    item: &Item,
    tag: CapabilityTag,
    thermostat_groups: &HashSet<&str>,
) -> Option<&'static [Action]> {
    match tag {
        CapabilityTag::Lighting | CapabilityTag::Switchable => type_actions(&item.item_type)
            .or_else(|| match (&item.item_type, &item.group_type) {
                (ItemType::Group, Some(group_type)) => type_actions(group_type),
                _ => None,
            }),
        // Sensors inside a thermostat group are already exposed by the group.
        CapabilityTag::CurrentTemperature => {
            let grouped = item
                .group_names
                .iter()
                .any(|g| thermostat_groups.contains(g.as_str()));
            (!grouped).then_some(SENSOR_ACTIONS)
        }
        CapabilityTag::Thermostat => item.is_group().then_some(THERMOSTAT_ACTIONS),
    }
}

fn type_actions(item_type: &ItemType) -> Option<&'static [Action]> {
    match item_type {
        ItemType::Switch => Some(SWITCH_ACTIONS),
        ItemType::Dimmer => Some(DIMMER_ACTIONS),
        ItemType::Color => Some(COLOR_ACTIONS),
        ItemType::Rollershutter => Some(ROLLERSHUTTER_ACTIONS),
        ItemType::Group | ItemType::Other(_) => None,
    }
}

fn device(item: &Item, raw_tag: &str, tag: CapabilityTag, actions: &[Action]) -> Device {
    let temperature_format = tag.reports_temperature().then(|| {
        if item.has_tag("Fahrenheit") || item.has_tag("fahrenheit") {
            TemperatureFormat::Fahrenheit
        } else {
            TemperatureFormat::Celsius
        }
    });

    Device {
        appliance_id: item.name.clone(),
        manufacturer_name: MANUFACTURER,
        model_name: raw_tag.to_string(),
        version: OPENHAB_VERSION,
        friendly_name: item.display_name().to_string(),
        friendly_description: format!(
            "{} {} {} via openHAB",
            item.item_type, item.name, raw_tag
        ),
        is_reachable: true,
        actions: actions.to_vec(),
        additional_appliance_details: ApplianceDetails {
            item_type: item.item_type.to_string(),
            item_tag: raw_tag.to_string(),
            openhab_version: OPENHAB_VERSION,
            temperature_format,
        },
    }
}
