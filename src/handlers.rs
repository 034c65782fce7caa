//! One handler per Alexa command family.
//!
//! Each handler reads what it needs from the hub, issues at most one write
//! and builds the reply. Failures come back as `Err`; the bridge turns them
//! into the `DependentServiceUnavailableError` envelope.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::debug;

use crate::event::{Adjustment, Appliance, Color, Header, OutboundEvent, Power};
use crate::hub::Hub;
use crate::protocol::{ReplyKind, reply};
use crate::thermostat::Thermostat;
use crate::types::{Item, celsius_to_fahrenheit, fahrenheit_to_celsius, thermostat_mode_label};
use crate::{Error, Result, discovery};

const TEMPERATURE_INVALID: &str = "Temperature data invalid";
const NO_CURRENT_TEMPERATURE: &str = "No current temperature data found";
const NO_TARGET_TEMPERATURE_DATA: &str = "No target temperature data found";

pub async fn discover_appliances<H: Hub>(hub: &H, header: &Header) -> Result<OutboundEvent> {
    let items = hub.items().await?;
    let devices = discovery::discover(&items)?;
    debug!(items = items.len(), appliances = devices.len(), "discovery complete");
    Ok(reply(
        header,
        ReplyKind::Response,
        json!({ "discoveredAppliances": devices }),
    ))
}

pub async fn switch<H: Hub>(
    hub: &H,
    header: &Header,
    appliance: &Appliance,
    power: Power,
) -> Result<OutboundEvent> {
    hub.send_command(&appliance.appliance_id, power.as_command())
        .await?;
    Ok(confirmation(header))
}

/// Absolute values are written as given; relative ones are applied to the
/// current state and saturate at 0 and 100.
pub async fn percentage<H: Hub>(
    hub: &H,
    header: &Header,
    appliance: &Appliance,
    adjustment: Adjustment,
) -> Result<OutboundEvent> {
    let id = &appliance.appliance_id;
    let value = match adjustment {
        Adjustment::Set(value) => value,
        relative => {
            let current = hub
                .item(id)
                .await?
                .numeric_state()
                .ok_or(Error::Unavailable("No existing percentage"))?;
            relative.apply(current).clamp(0.0, 100.0)
        }
    };
    hub.send_command(id, &value.to_string()).await?;
    Ok(confirmation(header))
}

pub async fn set_color<H: Hub>(
    hub: &H,
    header: &Header,
    appliance: &Appliance,
    color: Color,
    requested: &Value,
) -> Result<OutboundEvent> {
    hub.send_command(&appliance.appliance_id, &color.to_hsb_command())
        .await?;
    Ok(reply(
        header,
        ReplyKind::Confirmation,
        json!({ "achievedState": { "color": requested } }),
    ))
}

/// Reads a standalone sensor, or the sensor member of a thermostat group.
pub async fn current_temperature<H: Hub>(
    hub: &H,
    header: &Header,
    appliance: &Appliance,
) -> Result<OutboundEvent> {
    let item = hub
        .item(&appliance.appliance_id)
        .await
        .map_err(unavailable(NO_CURRENT_TEMPERATURE))?;
    let sensor = if item.is_group() {
        Thermostat::assemble(&item.members)
            .current_temperature
            .ok_or(Error::Unavailable(NO_CURRENT_TEMPERATURE))?
    } else {
        &item
    };
    let reading = temperature_state(sensor)?;

    Ok(reply(
        header,
        ReplyKind::Response,
        json!({
            "temperatureReading": { "value": to_celsius(reading, appliance.is_fahrenheit()) },
            "applianceResponseTimestamp": timestamp(),
        }),
    ))
}

pub async fn target_temperature<H: Hub>(
    hub: &H,
    header: &Header,
    appliance: &Appliance,
) -> Result<OutboundEvent> {
    let group = thermostat_group(hub, appliance, NO_TARGET_TEMPERATURE_DATA).await?;
    let thermostat = Thermostat::assemble(&group.members);
    let setpoint = thermostat
        .target_temperature
        .ok_or(Error::Unavailable(NO_TARGET_TEMPERATURE_DATA))?;
    let target = temperature_state(setpoint)?;

    let mode = thermostat
        .heating_cooling_mode
        .map(|item| thermostat_mode_label(&item.state))
        .unwrap_or_else(|| "CUSTOM".to_string());
    let mut temperature_mode = json!({ "value": mode });
    if mode == "CUSTOM" {
        temperature_mode["friendlyName"] = Value::from("");
    }

    Ok(reply(
        header,
        ReplyKind::Response,
        json!({
            "targetTemperature": { "value": to_celsius(target, appliance.is_fahrenheit()) },
            "applianceResponseTimestamp": timestamp(),
            "temperatureMode": temperature_mode,
        }),
    ))
}

/// Absolute targets arrive in Celsius and are converted for Fahrenheit hubs;
/// deltas are applied to the stored setpoint as-is.
pub async fn set_target_temperature<H: Hub>(
    hub: &H,
    header: &Header,
    appliance: &Appliance,
    adjustment: Adjustment,
) -> Result<OutboundEvent> {
    let group = thermostat_group(hub, appliance, "No thermostat found").await?;
    let thermostat = Thermostat::assemble(&group.members);
    let setpoint = thermostat
        .target_temperature
        .ok_or(Error::Unavailable("No target temperature"))?;
    let previous = setpoint
        .state
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::Unavailable(TEMPERATURE_INVALID))? as f64;

    let fahrenheit = appliance.is_fahrenheit();
    let target = match adjustment {
        Adjustment::Set(celsius) if fahrenheit => celsius_to_fahrenheit(celsius),
        other => other.apply(previous),
    };
    let mode = thermostat
        .heating_cooling_mode
        .map(|item| thermostat_mode_label(&item.state))
        .unwrap_or_else(|| "AUTO".to_string());

    hub.send_command(&setpoint.name, &target.to_string()).await?;

    Ok(reply(
        header,
        ReplyKind::Confirmation,
        json!({
            "targetTemperature": { "value": to_celsius(target, fahrenheit) },
            "temperatureMode": { "value": mode },
            "previousState": {
                "targetTemperature": { "value": to_celsius(previous, fahrenheit) },
                "mode": { "value": mode },
            },
        }),
    ))
}

/// A setpoint only exists inside a group, so anything else is rejected.
async fn thermostat_group<H: Hub>(
    hub: &H,
    appliance: &Appliance,
    reason: &'static str,
) -> Result<Item> {
    let item = hub
        .item(&appliance.appliance_id)
        .await
        .map_err(unavailable(reason))?;
    if !item.is_group() {
        return Err(Error::Unavailable(reason));
    }
    Ok(item)
}

fn temperature_state(item: &Item) -> Result<f64> {
    item.numeric_state()
        .ok_or(Error::Unavailable(TEMPERATURE_INVALID))
}

fn to_celsius(value: f64, fahrenheit: bool) -> f64 {
    if fahrenheit {
        fahrenheit_to_celsius(value)
    } else {
        value
    }
}

fn unavailable(reason: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| {
        debug!(error = %e, reason, "hub lookup failed");
        Error::Unavailable(reason)
    }
}

fn confirmation(header: &Header) -> OutboundEvent {
    reply(header, ReplyKind::Confirmation, json!({}))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemType;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeHub {
        items: HashMap<String, Item>,
        commands: Mutex<Vec<(String, String)>>,
        reject_writes: bool,
    }

    impl FakeHub {
        fn with(items: Vec<Item>) -> Self {
            Self {
                items: items.into_iter().map(|i| (i.name.clone(), i)).collect(),
                ..Default::default()
            }
        }

        fn commands(&self) -> Vec<(String, String)> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl Hub for FakeHub {
        async fn items(&self) -> Result<Vec<Item>> {
            Ok(self.items.values().cloned().collect())
        }

        async fn item(&self, name: &str) -> Result<Item> {
            self.items.get(name).cloned().ok_or(Error::Status(404))
        }

        async fn send_command(&self, name: &str, command: &str) -> Result<()> {
            if self.reject_writes {
                return Err(Error::Status(500));
            }
            self.commands
                .lock()
                .unwrap()
                .push((name.to_string(), command.to_string()));
            Ok(())
        }
    }

    fn item(name: &str, item_type: ItemType, state: &str, tags: &[&str]) -> Item {
        Item {
            name: name.to_string(),
            item_type,
            label: None,
            state: state.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            group_names: vec![],
            group_type: None,
            members: vec![],
        }
    }

    fn number(name: &str, state: &str, tags: &[&str]) -> Item {
        item(name, ItemType::Other("Number".into()), state, tags)
    }

    fn group(name: &str, members: Vec<Item>) -> Item {
        let mut g = item(name, ItemType::Group, "NULL", &["Thermostat"]);
        g.members = members;
        g
    }

    fn header(name: &str) -> Header {
        Header {
            namespace: "Alexa.ConnectedHome.Control".to_string(),
            name: name.to_string(),
            payload_version: "2".to_string(),
            message_id: Some("m".to_string()),
        }
    }

    fn appliance(id: &str, fahrenheit: bool) -> Appliance {
        let mut details = serde_json::Map::new();
        if fahrenheit {
            details.insert("temperatureFormat".into(), Value::from("fahrenheit"));
        }
        Appliance {
            appliance_id: id.to_string(),
            additional_appliance_details: details,
        }
    }

    #[tokio::test]
    async fn switch_writes_on_and_off() {
        let hub = FakeHub::default();
        let on = switch(&hub, &header("TurnOnRequest"), &appliance("Lamp", false), Power::On)
            .await
            .unwrap();
        switch(&hub, &header("TurnOffRequest"), &appliance("Lamp", false), Power::Off)
            .await
            .unwrap();
        assert_eq!(on.header.name, "TurnOnConfirmation");
        assert_eq!(on.payload, json!({}));
        assert_eq!(
            hub.commands(),
            vec![("Lamp".into(), "ON".into()), ("Lamp".into(), "OFF".into())]
        );
    }

    #[tokio::test]
    async fn relative_percentage_always_lands_in_range() {
        for current in [0.0, 3.0, 50.0, 90.0, 100.0] {
            for delta in [0.0, 5.0, 20.0, 150.0] {
                for adjustment in [Adjustment::Increment(delta), Adjustment::Decrement(delta)] {
                    let hub = FakeHub::with(vec![item(
                        "Dim",
                        ItemType::Dimmer,
                        &current.to_string(),
                        &[],
                    )]);
                    percentage(&hub, &header("X"), &appliance("Dim", false), adjustment)
                        .await
                        .unwrap();
                    let written: f64 = hub.commands()[0].1.parse().unwrap();
                    assert!((0.0..=100.0).contains(&written), "{current} {adjustment:?} -> {written}");
                    assert_eq!(written, adjustment.apply(current).clamp(0.0, 100.0));
                }
            }
        }
    }

    #[tokio::test]
    async fn relative_percentage_needs_numeric_state() {
        let hub = FakeHub::with(vec![item("Dim", ItemType::Dimmer, "NULL", &[])]);
        let err = percentage(
            &hub,
            &header("IncrementPercentageRequest"),
            &appliance("Dim", false),
            Adjustment::Increment(10.0),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason(), "No existing percentage");
        assert!(hub.commands().is_empty());
    }

    #[tokio::test]
    async fn rejected_write_is_an_error() {
        let hub = FakeHub {
            reject_writes: true,
            ..Default::default()
        };
        let err = set_color(
            &hub,
            &header("SetColorRequest"),
            &appliance("Bulb", false),
            Color {
                hue: 0.0,
                saturation: 1.0,
                brightness: 1.0,
            },
            &json!({"hue": 0, "saturation": 1, "brightness": 1}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason(), "OpenHAB error");
    }

    #[tokio::test]
    async fn current_temperature_from_group_member() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![
                number("Hall_Temp", "19.5", &["CurrentTemperature"]),
                number("Hall_Set", "21", &["TargetTemperature"]),
            ],
        )]);
        let out = current_temperature(
            &hub,
            &header("GetTemperatureReadingRequest"),
            &appliance("Hall", false),
        )
        .await
        .unwrap();
        assert_eq!(out.header.name, "GetTemperatureReadingResponse");
        assert_eq!(out.payload["temperatureReading"]["value"].as_f64(), Some(19.5));
        assert!(out.payload["applianceResponseTimestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn current_temperature_converts_fahrenheit_hub_value() {
        let hub = FakeHub::with(vec![number("Porch", "50", &["CurrentTemperature"])]);
        let out = current_temperature(&hub, &header("GetTemperatureReadingRequest"), &appliance("Porch", true))
            .await
            .unwrap();
        let value = out.payload["temperatureReading"]["value"].as_f64().unwrap();
        assert!((value - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn current_temperature_rejects_garbage_state() {
        let hub = FakeHub::with(vec![number("Porch", "UNDEF", &["CurrentTemperature"])]);
        let err = current_temperature(&hub, &header("GetTemperatureReadingRequest"), &appliance("Porch", false))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "Temperature data invalid");
    }

    #[tokio::test]
    async fn current_temperature_missing_item() {
        let hub = FakeHub::default();
        let err = current_temperature(&hub, &header("GetTemperatureReadingRequest"), &appliance("Gone", false))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "No current temperature data found");
    }

    #[tokio::test]
    async fn target_temperature_without_mode_is_custom() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![number("Hall_Set", "21", &["TargetTemperature"])],
        )]);
        let out = target_temperature(&hub, &header("GetTargetTemperatureRequest"), &appliance("Hall", false))
            .await
            .unwrap();
        assert_eq!(out.payload["targetTemperature"]["value"].as_f64(), Some(21.0));
        assert_eq!(out.payload["temperatureMode"], json!({"value": "CUSTOM", "friendlyName": ""}));
    }

    #[tokio::test]
    async fn target_temperature_reports_mode_label() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![
                number("Hall_Set", "21", &["TargetTemperature"]),
                number("Hall_Mode", "1", &["homekit:HeatingCoolingMode"]),
            ],
        )]);
        let out = target_temperature(&hub, &header("GetTargetTemperatureRequest"), &appliance("Hall", false))
            .await
            .unwrap();
        assert_eq!(out.payload["temperatureMode"], json!({"value": "HEAT"}));
    }

    #[tokio::test]
    async fn target_temperature_requires_group() {
        let hub = FakeHub::with(vec![number("Hall_Set", "21", &["TargetTemperature"])]);
        let err = target_temperature(&hub, &header("GetTargetTemperatureRequest"), &appliance("Hall_Set", false))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "No target temperature data found");
    }

    #[tokio::test]
    async fn increment_target_temperature() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![
                number("Hall_Set", "20", &["TargetTemperature"]),
                number("Hall_Mode", "heat-cool", &["homekit:HeatingCoolingMode"]),
            ],
        )]);
        let out = set_target_temperature(
            &hub,
            &header("IncrementTargetTemperatureRequest"),
            &appliance("Hall", false),
            Adjustment::Increment(2.0),
        )
        .await
        .unwrap();
        assert_eq!(hub.commands(), vec![("Hall_Set".into(), "22".into())]);
        assert_eq!(out.header.name, "IncrementTargetTemperatureConfirmation");
        assert_eq!(out.payload["targetTemperature"]["value"].as_f64(), Some(22.0));
        assert_eq!(out.payload["previousState"]["targetTemperature"]["value"].as_f64(), Some(20.0));
        assert_eq!(out.payload["temperatureMode"]["value"], "AUTO");
        assert_eq!(out.payload["previousState"]["mode"]["value"], "AUTO");
    }

    #[tokio::test]
    async fn absolute_target_is_converted_for_fahrenheit_hub() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![number("Hall_Set", "70", &["TargetTemperature"])],
        )]);
        let out = set_target_temperature(
            &hub,
            &header("SetTargetTemperatureRequest"),
            &appliance("Hall", true),
            Adjustment::Set(20.0),
        )
        .await
        .unwrap();
        assert_eq!(hub.commands(), vec![("Hall_Set".into(), "68".into())]);
        let reported = out.payload["targetTemperature"]["value"].as_f64().unwrap();
        assert!((reported - 20.0).abs() < 1e-9);
        let previous = out.payload["previousState"]["targetTemperature"]["value"].as_f64().unwrap();
        assert!((previous - fahrenheit_to_celsius(70.0)).abs() < 1e-9);
        assert_eq!(out.payload["temperatureMode"]["value"], "AUTO");
    }

    #[tokio::test]
    async fn set_target_needs_integer_setpoint() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![number("Hall_Set", "20.5", &["TargetTemperature"])],
        )]);
        let err = set_target_temperature(
            &hub,
            &header("SetTargetTemperatureRequest"),
            &appliance("Hall", false),
            Adjustment::Set(21.0),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason(), "Temperature data invalid");
        assert!(hub.commands().is_empty());
    }

    #[tokio::test]
    async fn set_target_without_setpoint_member() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![number("Hall_Temp", "20", &["CurrentTemperature"])],
        )]);
        let err = set_target_temperature(
            &hub,
            &header("SetTargetTemperatureRequest"),
            &appliance("Hall", false),
            Adjustment::Set(21.0),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason(), "No target temperature");
    }

    #[tokio::test]
    async fn color_is_written_as_hsb_and_echoed() {
        let hub = FakeHub::default();
        let color = Color {
            hue: 120.0,
            saturation: 0.5,
            brightness: 0.255,
        };
        let requested = json!({"hue": 120, "saturation": 0.5, "brightness": 0.255});
        let out = set_color(
            &hub,
            &header("SetColorRequest"),
            &appliance("Bulb", false),
            color,
            &requested,
        )
        .await
        .unwrap();
        assert_eq!(hub.commands(), vec![("Bulb".into(), "120,50,26".into())]);
        assert_eq!(out.payload["achievedState"]["color"], requested);
        assert!(out.payload["achievedState"]["color"]["hue"].is_u64());
    }

    #[tokio::test]
    async fn non_finite_percentage_state_is_rejected() {
        for state in ["NaN", "nan", "inf", "-infinity"] {
            let hub = FakeHub::with(vec![item("Dim", ItemType::Dimmer, state, &[])]);
            let err = percentage(
                &hub,
                &header("IncrementPercentageRequest"),
                &appliance("Dim", false),
                Adjustment::Increment(10.0),
            )
            .await
            .unwrap_err();
            assert_eq!(err.reason(), "No existing percentage", "state {state}");
            assert!(hub.commands().is_empty());
        }
    }

    #[tokio::test]
    async fn non_finite_temperature_state_is_invalid() {
        for state in ["nan", "NaN", "inf", "Infinity"] {
            let hub = FakeHub::with(vec![
                number("Porch", state, &["CurrentTemperature"]),
                group("Hall", vec![number("Hall_Set", state, &["TargetTemperature"])]),
            ]);
            let err = current_temperature(
                &hub,
                &header("GetTemperatureReadingRequest"),
                &appliance("Porch", false),
            )
            .await
            .unwrap_err();
            assert_eq!(err.reason(), "Temperature data invalid", "state {state}");
            let err = target_temperature(
                &hub,
                &header("GetTargetTemperatureRequest"),
                &appliance("Hall", false),
            )
            .await
            .unwrap_err();
            assert_eq!(err.reason(), "Temperature data invalid", "state {state}");
        }
    }

    #[tokio::test]
    async fn target_temperature_converts_fahrenheit_hub_value() {
        let hub = FakeHub::with(vec![group(
            "Hall",
            vec![number("Hall_Set", "68", &["TargetTemperature"])],
        )]);
        let out = target_temperature(&hub, &header("GetTargetTemperatureRequest"), &appliance("Hall", true))
            .await
            .unwrap();
        let value = out.payload["targetTemperature"]["value"].as_f64().unwrap();
        assert!((value - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn relative_target_on_fahrenheit_hub_applies_delta_to_stored_value() {
        for (adjustment, written) in [
            (Adjustment::Increment(2.0), "70"),
            (Adjustment::Decrement(3.0), "65"),
        ] {
            let hub = FakeHub::with(vec![group(
                "Hall",
                vec![number("Hall_Set", "68", &["TargetTemperature"])],
            )]);
            let out = set_target_temperature(
                &hub,
                &header("IncrementTargetTemperatureRequest"),
                &appliance("Hall", true),
                adjustment,
            )
            .await
            .unwrap();
            assert_eq!(hub.commands(), vec![("Hall_Set".into(), written.into())]);
            let expected = fahrenheit_to_celsius(written.parse().unwrap());
            let reported = out.payload["targetTemperature"]["value"].as_f64().unwrap();
            assert!((reported - expected).abs() < 1e-9);
            let previous = out.payload["previousState"]["targetTemperature"]["value"].as_f64().unwrap();
            assert!((previous - 20.0).abs() < 1e-9);
        }
    }
}
