//! GPIO driver engine: synthetic per-pin circuitry stepped once per tick.
//!
//! Drivers are a closed set of kinds selected at configure time. A driver
//! writes only the capability direction the sketch does not own for its
//! pin, so driver and sketch never contend on the same sub-value.

use vmcu_common::gpio::{BoardConfig, DriverSpec};
use vmcu_shm::HostPinTable;

/// Runtime state of one pin driver.
enum GpioDriver {
    Oscillator {
        period_ticks: u32,
        elapsed: u32,
        value: bool,
    },
    // Constant commits its value once at init; nothing left to step.
    Constant,
    PassThrough,
}

/// All active drivers for a running board.
pub(crate) struct DriverEngine {
    drivers: Vec<(usize, GpioDriver)>,
}

impl DriverEngine {
    /// Instantiate drivers from the configuration and commit their initial
    /// values into the table.
    ///
    /// Attaching a circuit defines the wiring, so the driven capability is
    /// declared present here rather than waiting for the sketch.
    pub(crate) fn new(cfg: &BoardConfig, table: &HostPinTable) -> Self {
        let mut drivers = Vec::with_capacity(cfg.gpio_drivers.len());

        for (pin, spec) in &cfg.gpio_drivers {
            let Some(index) = table.slot_index(*pin) else {
                // configure() validated driver pins; a miss here means the
                // config was mutated behind our back.
                tracing::warn!(pin, "driver targets pin without a slot, skipping");
                continue;
            };
            let Some(slot) = table.slot(index) else {
                continue;
            };

            let driver = match spec {
                DriverSpec::Oscillator {
                    period_ticks,
                    initial,
                } => {
                    slot.declare_digital();
                    slot.set_digital(*initial);
                    GpioDriver::Oscillator {
                        period_ticks: (*period_ticks).max(1),
                        elapsed: 0,
                        value: *initial,
                    }
                }
                DriverSpec::Constant { value } => {
                    slot.declare_analog();
                    slot.set_analog(*value);
                    GpioDriver::Constant
                }
                DriverSpec::PassThrough => GpioDriver::PassThrough,
            };

            tracing::debug!(pin, kind = ?spec, "gpio driver initialized");
            drivers.push((index, driver));
        }

        Self { drivers }
    }

    /// Advance every driver's timer by one tick and commit due writes.
    pub(crate) fn step(&mut self, table: &HostPinTable) {
        for (index, driver) in &mut self.drivers {
            if let GpioDriver::Oscillator {
                period_ticks,
                elapsed,
                value,
            } = driver
            {
                *elapsed += 1;
                if *elapsed >= *period_ticks {
                    *elapsed = 0;
                    *value = !*value;
                    if let Some(slot) = table.slot(*index) {
                        slot.set_digital(*value);
                    }
                }
            }
        }
    }

    /// Number of active drivers.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.drivers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn config(pins: &[u16], drivers: &[(u16, DriverSpec)]) -> BoardConfig {
        BoardConfig {
            pins: pins.iter().copied().collect::<BTreeSet<_>>(),
            gpio_drivers: drivers.iter().cloned().collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn oscillator_flips_on_period_boundary() {
        let cfg = config(
            &[13],
            &[(
                13,
                DriverSpec::Oscillator {
                    period_ticks: 3,
                    initial: false,
                },
            )],
        );
        let table = HostPinTable::create(&cfg.pins).unwrap();
        let mut engine = DriverEngine::new(&cfg, &table);
        let slot = table.slot_for_pin(13).unwrap();

        assert!(slot.has_digital());
        assert!(!slot.digital());

        engine.step(&table);
        engine.step(&table);
        assert!(!slot.digital()); // 2 ticks, period is 3

        engine.step(&table);
        assert!(slot.digital()); // flipped

        for _ in 0..3 {
            engine.step(&table);
        }
        assert!(!slot.digital()); // flipped back
    }

    #[test]
    fn constant_commits_once_at_init() {
        let cfg = config(&[7], &[(7, DriverSpec::Constant { value: 880 })]);
        let table = HostPinTable::create(&cfg.pins).unwrap();
        let mut engine = DriverEngine::new(&cfg, &table);
        let slot = table.slot_for_pin(7).unwrap();

        assert!(slot.has_analog());
        assert_eq!(slot.analog(), 880);

        engine.step(&table);
        assert_eq!(slot.analog(), 880);
    }

    #[test]
    fn pass_through_declares_nothing() {
        let cfg = config(&[5], &[(5, DriverSpec::PassThrough)]);
        let table = HostPinTable::create(&cfg.pins).unwrap();
        let mut engine = DriverEngine::new(&cfg, &table);
        let slot = table.slot_for_pin(5).unwrap();

        assert_eq!(engine.len(), 1);
        assert!(!slot.exists());

        engine.step(&table);
        assert!(!slot.exists());
    }
}
