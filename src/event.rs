//! Alexa Smart Home (payload version 2) event shapes.
//!
//! The inbound payload is kept as raw JSON until a [`Directive`] is parsed out
//! of it, so each command family only demands the fields it actually uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub payload_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub header: Header,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub header: Header,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appliance {
    pub appliance_id: String,
    #[serde(default)]
    pub additional_appliance_details: Map<String, Value>,
}

impl Appliance {
    /// True when discovery stamped this appliance as a Fahrenheit hub item.
    pub fn is_fahrenheit(&self) -> bool {
        self.additional_appliance_details
            .get("temperatureFormat")
            .and_then(Value::as_str)
            == Some("fahrenheit")
    }
}

/// HSB color as sent by Alexa: hue in degrees, saturation/brightness in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl Color {
    /// openHAB `HSBType` command, e.g. `"350.5,71,80"`.
    pub fn to_hsb_command(&self) -> String {
        format!(
            "{},{},{}",
            self.hue,
            (self.saturation * 100.0).round(),
            (self.brightness * 100.0).round()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn as_command(&self) -> &'static str {
        match self {
            Power::On => "ON",
            Power::Off => "OFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    Set(f64),
    Increment(f64),
    Decrement(f64),
}

impl Adjustment {
    pub fn apply(self, current: f64) -> f64 {
        match self {
            Adjustment::Set(v) => v,
            Adjustment::Increment(delta) => current + delta,
            Adjustment::Decrement(delta) => current - delta,
        }
    }
}

/// A Control or Query request, decoded from its header name and payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Switch {
        appliance: Appliance,
        power: Power,
    },
    Percentage {
        appliance: Appliance,
        adjustment: Adjustment,
    },
    SetColor {
        appliance: Appliance,
        color: Color,
        /// The inbound `color` object, echoed back untouched.
        requested: Value,
    },
    GetTemperatureReading {
        appliance: Appliance,
    },
    GetTargetTemperature {
        appliance: Appliance,
    },
    TargetTemperature {
        appliance: Appliance,
        adjustment: Adjustment,
    },
}

#[derive(Deserialize)]
struct Amount {
    value: f64,
}

impl Directive {
    pub fn parse(event: &InboundEvent) -> Result<Self> {
        let payload = &event.payload;
        let appliance = || field::<Appliance>(payload, "appliance");
        let amount = |key: &str| field::<Amount>(payload, key).map(|a| a.value);

        let directive = match event.header.name.as_str() {
            "TurnOnRequest" => Directive::Switch {
                appliance: appliance()?,
                power: Power::On,
            },
            "TurnOffRequest" => Directive::Switch {
                appliance: appliance()?,
                power: Power::Off,
            },
            "SetPercentageRequest" => Directive::Percentage {
                appliance: appliance()?,
                adjustment: Adjustment::Set(amount("percentageState")?),
            },
            "IncrementPercentageRequest" => Directive::Percentage {
                appliance: appliance()?,
                adjustment: Adjustment::Increment(amount("deltaPercentage")?),
            },
            "DecrementPercentageRequest" => Directive::Percentage {
                appliance: appliance()?,
                adjustment: Adjustment::Decrement(amount("deltaPercentage")?),
            },
            "SetColorRequest" => Directive::SetColor {
                appliance: appliance()?,
                color: field(payload, "color")?,
                requested: payload["color"].clone(),
            },
            "GetTemperatureReadingRequest" => Directive::GetTemperatureReading {
                appliance: appliance()?,
            },
            "GetTargetTemperatureRequest" => Directive::GetTargetTemperature {
                appliance: appliance()?,
            },
            "SetTargetTemperatureRequest" => Directive::TargetTemperature {
                appliance: appliance()?,
                adjustment: Adjustment::Set(amount("targetTemperature")?),
            },
            "IncrementTargetTemperatureRequest" => Directive::TargetTemperature {
                appliance: appliance()?,
                adjustment: Adjustment::Increment(amount("deltaTemperature")?),
            },
            "DecrementTargetTemperatureRequest" => Directive::TargetTemperature {
                appliance: appliance()?,
                adjustment: Adjustment::Decrement(amount("deltaTemperature")?),
            },
            other => return Err(Error::UnsupportedDirective(other.to_string())),
        };
        Ok(directive)
    }

    pub fn appliance(&self) -> &Appliance {
        match self {
            Directive::Switch { appliance, .. }
            | Directive::Percentage { appliance, .. }
            | Directive::SetColor { appliance, .. }
            | Directive::GetTemperatureReading { appliance }
            | Directive::GetTargetTemperature { appliance }
            | Directive::TargetTemperature { appliance, .. } => appliance,
        }
    }
}

/// Reply names are derived by swapping `Request` for the reply kind, which
/// only works when the inbound name contains it exactly once.
pub fn validate_request_name(header: &Header) -> Result<()> {
    match header.name.matches("Request").count() {
        1 => Ok(()),
        _ => Err(Error::MalformedEvent(format!(
            "header name {:?} must contain \"Request\" exactly once",
            header.name
        ))),
    }
}

fn field<T: DeserializeOwned>(payload: &Value, key: &str) -> Result<T> {
    let raw = payload
        .get(key)
        .ok_or_else(|| Error::MalformedEvent(format!("missing payload.{key}")))?;
    T::deserialize(raw).map_err(|e| Error::MalformedEvent(format!("payload.{key}: {e}")))
}
