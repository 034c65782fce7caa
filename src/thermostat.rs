use crate::types::Item;

/// A thermostat assembled from the tagged members of an openHAB group.
///
/// openHAB has no single thermostat item; the setpoint, the sensor and the
/// optional HomeKit mode item live side by side in a group tagged
/// `Thermostat`. Any role may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thermostat<'a> {
    pub current_temperature: Option<&'a Item>,
    pub target_temperature: Option<&'a Item>,
    pub heating_cooling_mode: Option<&'a Item>,
}

impl<'a> Thermostat<'a> {
    /// Binds each role to the member carrying its tag; later members win.
    pub fn assemble(members: &'a [Item]) -> Self {
        let mut thermostat = Thermostat::default();
        for member in members {
            for tag in &member.tags {
                match tag.as_str() {
                    "CurrentTemperature" => thermostat.current_temperature = Some(member),
                    "TargetTemperature" => thermostat.target_temperature = Some(member),
                    "homekit:HeatingCoolingMode" => thermostat.heating_cooling_mode = Some(member),
                    _ => {}
                }
            }
        }
        thermostat
    }
}
