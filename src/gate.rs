//! Busy gate shared between the interrupt path and the configuration path.
//!
//! The interrupt path only ever tries once and drops the report when the
//! gate is held. Configuration polls for a bounded time and then gives up.

use core::cell::Cell;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;

/// Poll interval while waiting for the gate.
pub const POLL_INTERVAL_MS: u32 = 1;

/// The gate stayed held for the whole wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Busy;

/// Non-reentrant busy flag.
///
/// `const` constructible so it can live in a `static` next to the interrupt
/// handler that services the device.
pub struct BusyGate {
    busy: Mutex<Cell<bool>>,
}

impl core::fmt::Debug for BusyGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusyGate")
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl Default for BusyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyGate {
    pub const fn new() -> Self {
        Self {
            busy: Mutex::new(Cell::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        critical_section::with(|cs| self.busy.borrow(cs).get())
    }

    /// Takes the gate if it is free. Never waits.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        let acquired = critical_section::with(|cs| {
            let busy = self.busy.borrow(cs);
            if busy.get() {
                false
            } else {
                busy.set(true);
                true
            }
        });
        acquired.then(|| BusyGuard { gate: self })
    }

    /// Takes the gate, polling every [`POLL_INTERVAL_MS`] for at most
    /// `timeout_ms`.
    pub fn acquire_within<D: DelayNs>(
        &self,
        delay: &mut D,
        timeout_ms: u32,
    ) -> Result<BusyGuard<'_>, Busy> {
        let mut waited = 0;
        loop {
            if let Some(guard) = self.try_acquire() {
                return Ok(guard);
            }
            if waited >= timeout_ms {
                return Err(Busy);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
            waited += POLL_INTERVAL_MS;
        }
    }

    #[cfg(feature = "async")]
    pub async fn acquire_within_async<D: embedded_hal_async::delay::DelayNs>(
        &self,
        delay: &mut D,
        timeout_ms: u32,
    ) -> Result<BusyGuard<'_>, Busy> {
        let mut waited = 0;
        loop {
            if let Some(guard) = self.try_acquire() {
                return Ok(guard);
            }
            if waited >= timeout_ms {
                return Err(Busy);
            }
            delay.delay_ms(POLL_INTERVAL_MS).await;
            waited += POLL_INTERVAL_MS;
        }
    }

    fn release(&self) {
        critical_section::with(|cs| self.busy.borrow(cs).set(false));
    }
}

/// Holds the gate; dropping it releases the gate for the next waiter.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    gate: &'a BusyGate,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
