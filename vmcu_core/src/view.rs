//! Validity-scoped host views into the shared pin table.
//!
//! A [`BoardView`] is a live handle: `valid()` tracks the board status in
//! real time, including for views obtained before a transition. After
//! `stop()`/`terminate()`/`reset()` the table is unmapped and every
//! accessor on every outstanding handle fails with its sentinel instead of
//! touching freed memory.

use crate::board::Status;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use vmcu_common::table::PinSlot;
use vmcu_shm::HostPinTable;

/// State shared between a [`Board`](crate::Board) and its views.
pub(crate) struct ViewShared {
    /// Mirror of the board status, encoded via [`Status::as_u8`].
    pub(crate) status: AtomicU8,
    /// Live table mapping; `None` once torn down.
    pub(crate) table: RwLock<Option<Arc<HostPinTable>>>,
}

impl ViewShared {
    pub(crate) fn new() -> Self {
        Self {
            status: AtomicU8::new(Status::Clean.as_u8()),
            table: RwLock::new(None),
        }
    }

    fn status(&self) -> Status {
        Status::from_u8(self.status.load(std::sync::atomic::Ordering::Acquire))
    }

    fn live(&self) -> bool {
        matches!(self.status(), Status::Running | Status::Suspended)
    }
}

/// Aggregate view over all configured pins.
#[derive(Clone)]
pub struct BoardView {
    shared: Arc<ViewShared>,
}

impl BoardView {
    pub(crate) fn new(shared: Arc<ViewShared>) -> Self {
        Self { shared }
    }

    /// True iff the board is `running` or `suspended`.
    pub fn valid(&self) -> bool {
        self.shared.live()
    }

    /// Pin numbers currently backed by table slots. Empty when invalid.
    pub fn pin_ids(&self) -> Vec<u16> {
        if !self.valid() {
            return Vec::new();
        }
        self.shared
            .table
            .read()
            .as_ref()
            .map(|table| table.pins().to_vec())
            .unwrap_or_default()
    }

    /// View of a single pin. Always constructible; accessors report
    /// non-existence for pins outside the configuration.
    pub fn pin(&self, pin: u16) -> PinView {
        PinView {
            shared: Arc::clone(&self.shared),
            pin,
        }
    }
}

/// View of one pin slot.
#[derive(Clone)]
pub struct PinView {
    shared: Arc<ViewShared>,
    pin: u16,
}

impl PinView {
    /// Pin number this view addresses.
    pub fn pin(&self) -> u16 {
        self.pin
    }

    /// Whether the slot's capability flag is set. False once the table is
    /// torn down or if the pin was never configured.
    pub fn exists(&self) -> bool {
        self.with_slot(|slot| slot.exists()).unwrap_or(false)
    }

    /// Digital sub-accessor.
    pub fn digital(&self) -> DigitalPin {
        DigitalPin {
            inner: self.clone(),
        }
    }

    /// Analog sub-accessor.
    pub fn analog(&self) -> AnalogPin {
        AnalogPin {
            inner: self.clone(),
        }
    }

    fn with_slot<R>(&self, f: impl FnOnce(&PinSlot) -> R) -> Option<R> {
        if !self.shared.live() {
            return None;
        }
        let guard = self.shared.table.read();
        let table = guard.as_ref()?;
        table.slot_for_pin(self.pin).map(f)
    }
}

/// Digital capability of a pin.
pub struct DigitalPin {
    inner: PinView,
}

impl DigitalPin {
    /// Whether the digital capability has been declared on this pin.
    pub fn exists(&self) -> bool {
        self.inner
            .with_slot(|slot| slot.has_digital())
            .unwrap_or(false)
    }

    /// Observed digital value; `None` if the capability does not exist or
    /// the view is no longer valid.
    pub fn read(&self) -> Option<bool> {
        self.inner
            .with_slot(|slot| slot.has_digital().then(|| slot.digital()))
            .flatten()
    }

    /// Drive the digital value from the host. Fails (returns false) on a
    /// non-existent capability or an invalid view.
    pub fn write(&self, value: bool) -> bool {
        self.inner
            .with_slot(|slot| {
                if slot.has_digital() {
                    slot.set_digital(value);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }
}

/// Analog capability of a pin.
pub struct AnalogPin {
    inner: PinView,
}

impl AnalogPin {
    /// Whether the analog capability has been declared on this pin.
    pub fn exists(&self) -> bool {
        self.inner
            .with_slot(|slot| slot.has_analog())
            .unwrap_or(false)
    }

    /// Observed analog value; `None` if the capability does not exist or
    /// the view is no longer valid.
    pub fn read(&self) -> Option<u16> {
        self.inner
            .with_slot(|slot| slot.has_analog().then(|| slot.analog()))
            .flatten()
    }

    /// Drive the analog value from the host. Fails (returns false) on a
    /// non-existent capability or an invalid view.
    pub fn write(&self, value: u16) -> bool {
        self.inner
            .with_slot(|slot| {
                if slot.has_analog() {
                    slot.set_analog(value);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }
}
