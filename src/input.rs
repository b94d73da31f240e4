//! Interface to the input framework that receives decoded touchpad state.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Mouse class reported to the input framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceType {
    Unknown = 0,
    Touchpad = 20,
}

/// Hardware flavour of the pointing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwType {
    Touchpad = 2,
    /// Touchpad whose surface is the button.
    Clickpad = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// Plain relative mouse events.
    Compat = 0,
    /// Full multi-touch events.
    Native = 1,
}

bitflags! {
    /// Button mask handed to [`InputSink::buttons`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        const LEFT   = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT  = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Buttons {
    fn format(&self, f: defmt::Formatter) {
        self.iter_names().for_each(|name| {
            defmt::write!(f, "{}", name);
        });
    }
}

/// Coordinate calibration, exchanged verbatim over the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub swap_xy: bool,
    /// Horizontal resolution in DPI.
    pub res_x: i32,
    /// Vertical resolution in DPI.
    pub res_y: i32,
}

/// Capability descriptor pushed to the input framework on enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchpadHw {
    pub device_type: DeviceType,
    pub hw_type: HwType,
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
    pub h_res: i32,
    pub v_res: i32,
    /// Number of simultaneous contact slots.
    pub mt_slots: u8,
}

/// Receiver of decoded touchpad state.
///
/// A report is delivered as one `mt_state` call per slot, then `buttons`,
/// then `sync`.
pub trait InputSink {
    type Error: core::fmt::Debug;

    /// Registers the device capabilities. An error leaves the device disabled.
    fn configure(&mut self, hw: &TouchpadHw) -> Result<(), Self::Error>;

    /// Position of the contact in `slot`. A lifted finger is all zeroes.
    fn mt_state(&mut self, slot: u8, x: u16, y: u16, pressure: u8);

    fn buttons(&mut self, buttons: Buttons);

    /// Commits everything since the last sync as one frame.
    fn sync(&mut self);

    fn set_mode(&mut self, mode: InputMode);

    fn device_type(&self) -> DeviceType;
}
