use embedded_hal::i2c::{Error, ErrorKind};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::input::{Buttons, Calibration, DeviceType, HwType, InputMode, InputSink, TouchpadHw};

/// Default bus address of Elantech I2C touchpads.
pub(crate) const IETP_ADDRESS: u8 = 0x15;

/// Size of an absolute-mode report.
pub const REPORT_LEN: usize = 34;
/// Number of contact slots in a report.
pub const MAX_FINGERS: usize = 5;

pub(crate) const REPORT_ABSOLUTE: u8 = 0x5D;

const REPORT_ID: usize = 2;
const TOUCH_INFO: usize = 3;
const FINGER_DATA: usize = 4;

const FINGER_DATA_LEN: usize = 5;
const FINGER_XY_HIGH: usize = 0;
const FINGER_X_LOW: usize = 1;
const FINGER_Y_LOW: usize = 2;
const FINGER_PRESSURE: usize = 4;

const TOUCH_LMB: u8 = 1 << 0;
const TOUCH_RMB: u8 = 1 << 1;
const TOUCH_MMB: u8 = 1 << 2;

const AXIS_MASK: u16 = 0x0FFF;

/// Bounded wait for the busy gate, in milliseconds.
pub const DEFAULT_ENABLE_TIMEOUT_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Reset acknowledgement, also where reports are read from.
    Report = 0x0000,
    Input = 0x0003,
    Command = 0x0005,
    MaxXAxis = 0x0106,
    MaxYAxis = 0x0107,
    Resolution = 0x0108,
    Control = 0x0300,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Reset = 0x0100,
    Wakeup = 0x0800,
    Sleep = 0x0801,
}

/// Report format selected through [`Register::Control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportMode {
    Standard = 0x0000,
    Absolute = 0x0001,
}

/// Numeric control-channel commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlCode {
    GetType = 32,
    SetCalibration = 36,
    GetCalibration = 37,
    SetMode = 38,
}

/// Argument passed along with a [`ControlCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlArg {
    None,
    Calibration(Calibration),
    Mode(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlResponse {
    Done,
    Calibration(Calibration),
    Type(DeviceType),
}

/// Lifecycle of an attached touchpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Uninitialized,
    Resetting,
    Configured,
    Enabled,
    Sleeping,
}

/// What an interrupt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptStatus {
    /// A report was decoded and dispatched.
    Processed,
    /// The report had the wrong id or was too short.
    Discarded,
    /// Another report or a configuration change holds the gate.
    Busy,
}

/// Errors that can occur when interacting with the touchpad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IetpError {
    I2CError(ErrorKind),
    /// The busy gate was not released in time.
    Busy,
    /// The input framework rejected the capability descriptor.
    Configuration,
    InvalidMode(u32),
    UnsupportedControl(u32),
    InvalidArgument,
    PinError,
}

impl<E> From<E> for IetpError
where
    E: Error,
{
    fn from(e: E) -> Self {
        IetpError::I2CError(e.kind())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IetpConfig {
    pub address: u8,
    /// Identifier handed over by the bus enumerator, if any.
    pub hid: Option<[u8; 16]>,
    pub enable_timeout_ms: u32,
}

impl Default for IetpConfig {
    fn default() -> Self {
        Self {
            address: IETP_ADDRESS,
            hid: None,
            enable_timeout_ms: DEFAULT_ENABLE_TIMEOUT_MS,
        }
    }
}

/// One finger slot of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Contact {
    pub valid: bool,
    pub x: u16,
    pub y: u16,
    pub pressure: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
    pub contacts: [Contact; MAX_FINGERS],
    pub buttons: Buttons,
}

/// Axis limits and resolution as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub max_x: u16,
    pub max_y: u16,
    /// DPI
    pub res_x: u16,
    /// DPI
    pub res_y: u16,
}

impl Geometry {
    pub fn from_registers(max_x: u16, max_y: u16, resolution: u16) -> Self {
        let [code_x, code_y] = resolution.to_le_bytes();
        Self {
            max_x: max_x & AXIS_MASK,
            max_y: max_y & AXIS_MASK,
            res_x: resolution_to_dpi(code_x),
            res_y: resolution_to_dpi(code_y),
        }
    }

    /// Full reported range, no axis swap.
    pub fn calibration(&self) -> Calibration {
        Calibration {
            min_x: 0,
            max_x: i32::from(self.max_x),
            min_y: 0,
            max_y: i32::from(self.max_y),
            swap_xy: false,
            res_x: i32::from(self.res_x),
            res_y: i32::from(self.res_y),
        }
    }
}

/// Converts the device's resolution code to DPI.
pub fn resolution_to_dpi(code: u8) -> u16 {
    790 + u16::from(code) * 10
}

/// Decodes an absolute-mode report.
///
/// Returns `None` for anything that is not a full absolute report; the
/// device regularly sends zero-length reports which are simply dropped.
pub fn parse_report(raw: &[u8; REPORT_LEN]) -> Option<Report> {
    let len = u16::from_le_bytes([raw[0], raw[1]]);
    if raw[REPORT_ID] != REPORT_ABSOLUTE || usize::from(len) < REPORT_LEN {
        return None;
    }

    let touch_info = raw[TOUCH_INFO];
    let mut contacts = [Contact::default(); MAX_FINGERS];
    let fingers = raw[FINGER_DATA..].chunks_exact(FINGER_DATA_LEN);
    for (slot, (contact, finger)) in contacts.iter_mut().zip(fingers).enumerate() {
        if touch_info & (1 << (slot + 3)) != 0 {
            *contact = contact_from_finger_data(finger);
        }
    }

    Some(Report {
        contacts,
        buttons: buttons_from_touch_info(touch_info),
    })
}

fn contact_from_finger_data(finger: &[u8]) -> Contact {
    let xy_high = finger[FINGER_XY_HIGH];
    Contact {
        valid: true,
        x: coord_from_registers(xy_high >> 4, finger[FINGER_X_LOW]),
        y: coord_from_registers(xy_high & 0x0F, finger[FINGER_Y_LOW]),
        pressure: finger[FINGER_PRESSURE],
    }
}

/// 12 bit coordinate from a high nibble and a low byte.
fn coord_from_registers(high_nibble: u8, low: u8) -> u16 {
    (u16::from(high_nibble & 0x0F) << 8) | u16::from(low)
}

fn buttons_from_touch_info(touch_info: u8) -> Buttons {
    let mut buttons = Buttons::empty();
    if touch_info & TOUCH_LMB != 0 {
        buttons |= Buttons::LEFT;
    }
    if touch_info & TOUCH_MMB != 0 {
        buttons |= Buttons::MIDDLE;
    }
    if touch_info & TOUCH_RMB != 0 {
        buttons |= Buttons::RIGHT;
    }
    buttons
}

/// Hands a decoded report to the input framework.
///
/// Buttons and sync go out inside one critical section so nothing else at
/// interrupt level lands between them.
pub(crate) fn dispatch_report<S: InputSink>(sink: &mut S, report: &Report) {
    for (slot, contact) in report.contacts.iter().enumerate() {
        if contact.valid {
            sink.mt_state(slot as u8, contact.x, contact.y, contact.pressure);
        } else {
            sink.mt_state(slot as u8, 0, 0, 0);
        }
    }

    critical_section::with(|_| {
        sink.buttons(report.buttons);
        sink.sync();
    });
}

pub(crate) fn touchpad_hw(calibration: &Calibration) -> TouchpadHw {
    TouchpadHw {
        device_type: DeviceType::Touchpad,
        hw_type: HwType::Clickpad,
        x_min: calibration.min_x,
        x_max: calibration.max_x,
        y_min: calibration.min_y,
        y_max: calibration.max_y,
        h_res: calibration.res_x,
        v_res: calibration.res_y,
        mt_slots: MAX_FINGERS as u8,
    }
}

pub(crate) fn handle_control<S: InputSink>(
    sink: &mut S,
    calibration: &mut Calibration,
    code: u32,
    arg: ControlArg,
) -> Result<ControlResponse, IetpError> {
    let code = ControlCode::try_from(code).map_err(|_| IetpError::UnsupportedControl(code))?;
    debug!("ietp: control {}", u32::from(code));
    match (code, arg) {
        (ControlCode::SetCalibration, ControlArg::Calibration(new)) => {
            *calibration = new;
            Ok(ControlResponse::Done)
        }
        (ControlCode::GetCalibration, _) => Ok(ControlResponse::Calibration(*calibration)),
        (ControlCode::GetType, _) => Ok(ControlResponse::Type(sink.device_type())),
        (ControlCode::SetMode, ControlArg::Mode(raw)) => {
            let mode = InputMode::try_from(raw).map_err(|_| {
                error!("ietp: invalid mode {}", raw);
                IetpError::InvalidMode(raw)
            })?;
            sink.set_mode(mode);
            Ok(ControlResponse::Done)
        }
        _ => Err(IetpError::InvalidArgument),
    }
}

#[cfg(feature = "async")]
pub mod asynch;
pub mod blocking;
