//! Board configuration and GPIO driver specifications.
//!
//! A [`BoardConfig`] names the pins a board exposes and optionally wires a
//! synthetic [`DriverSpec`] to each of them. Driver kinds are a closed set
//! selected at configure time; the board never loads driver plugins.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Virtual pin number. Matches the pin numbering the sketch uses.
pub type PinId = u16;

fn default_initial() -> bool {
    false
}

/// Synthetic circuit attached to a pin.
///
/// A driver only ever writes the capability direction the sketch does not
/// own for that pin: it supplies inputs or observes outputs, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverSpec {
    /// Flips a digital input between two states on a fixed tick period.
    Oscillator {
        /// Ticks between flips. Must be at least 1.
        period_ticks: u32,
        /// Value the pin holds before the first flip.
        #[serde(default = "default_initial")]
        initial: bool,
    },
    /// Holds an analog input at a fixed value.
    Constant {
        /// Raw analog reading presented to the sketch.
        value: u16,
    },
    /// No synthetic writes; the host merely observes what the sketch writes.
    PassThrough,
}

/// Set of pins to expose plus their optional drivers.
///
/// Both collections are ordered by pin number so the shared-table slot
/// layout is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Pin numbers exposed to the sketch.
    #[serde(default)]
    pub pins: BTreeSet<PinId>,
    /// Driver wiring, keyed by pin number.
    #[serde(default, with = "pin_key_map")]
    pub gpio_drivers: BTreeMap<PinId, DriverSpec>,
}

/// TOML table keys are strings, so the driver map round-trips through
/// stringified pin numbers.
mod pin_key_map {
    use super::{DriverSpec, PinId};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<PinId, DriverSpec>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let keyed: BTreeMap<String, &DriverSpec> = map
            .iter()
            .map(|(pin, spec)| (pin.to_string(), spec))
            .collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PinId, DriverSpec>, D::Error> {
        let keyed = BTreeMap::<String, DriverSpec>::deserialize(deserializer)?;
        keyed
            .into_iter()
            .map(|(key, spec)| {
                key.parse::<PinId>()
                    .map(|pin| (pin, spec))
                    .map_err(|_| D::Error::custom(format!("invalid pin number `{key}`")))
            })
            .collect()
    }
}

impl BoardConfig {
    /// Check structural validity: every driver must target a configured pin
    /// and oscillator periods must be non-zero.
    pub fn is_well_formed(&self) -> bool {
        for (pin, spec) in &self.gpio_drivers {
            if !self.pins.contains(pin) {
                return false;
            }
            if let DriverSpec::Oscillator { period_ticks, .. } = spec {
                if *period_ticks == 0 {
                    return false;
                }
            }
        }
        true
    }
}
