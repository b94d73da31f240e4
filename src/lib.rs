#![no_std]
//! Elantech I2C touchpad driver
//!
//! Drives the touchpad over a two-wire bus in absolute (multi-touch) mode
//! and forwards up to five contacts plus button state to an [`InputSink`].
//! Blocking access is built on `embedded-hal`; the `async` feature adds the
//! same driver on `embedded-hal-async`.
//!
//! A [`BusyGate`] keeps report processing single-flight: the interrupt path
//! drops a report while the gate is held, configuration waits a bounded time
//! for it.

#[macro_use]
mod fmt;

/// Busy gate shared by interrupt and configuration paths.
pub mod gate;

/// Elantech touchpad driver.
pub mod ietp;

/// Input framework interface.
pub mod input;

mod register;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;

pub use gate::{Busy, BusyGate, BusyGuard};
pub use ietp::blocking::Ietp;
pub use ietp::{
    Contact, ControlArg, ControlCode, ControlResponse, DeviceState, Geometry, IetpConfig,
    IetpError, InterruptStatus, Report,
};
pub use input::{Buttons, Calibration, DeviceType, HwType, InputMode, InputSink, TouchpadHw};
#[cfg(feature = "async")]
pub use register::AsyncRegisterDevice;
pub use register::BlockingRegisterDevice;

#[cfg(feature = "async")]
pub use ietp::asynch::IetpAsync;
