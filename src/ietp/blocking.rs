use super::{
    dispatch_report, handle_control, parse_report, touchpad_hw, Command, ControlArg,
    ControlResponse, DeviceState, Geometry, IetpConfig, IetpError, InterruptStatus, Register,
    ReportMode, REPORT_LEN,
};
use crate::gate::BusyGate;
use crate::input::{Calibration, InputMode, InputSink};
use crate::BlockingRegisterDevice;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;

/// Elantech I2C touchpad.
///
/// `gate` is shared with whatever services the attention interrupt; reports
/// arriving while it is held are dropped.
#[derive(Debug)]
pub struct Ietp<'g, I2C, S, DELAY, PIN> {
    dev: BlockingRegisterDevice<I2C>,
    sink: S,
    delay: DELAY,
    attention: Option<PIN>,
    gate: &'g BusyGate,
    config: IetpConfig,
    geometry: Geometry,
    calibration: Calibration,
    enabled: bool,
    state: DeviceState,
}

impl<'g, I2C, S, DELAY, PIN> Ietp<'g, I2C, S, DELAY, PIN>
where
    I2C: I2c,
    S: InputSink,
    DELAY: DelayNs,
    PIN: InputPin,
{
    /// Create a new, unconfigured instance. Nothing is sent on the bus.
    pub fn new(
        i2c: I2C,
        sink: S,
        delay: DELAY,
        attention: Option<PIN>,
        gate: &'g BusyGate,
        config: IetpConfig,
    ) -> Self {
        Self {
            dev: BlockingRegisterDevice::new(i2c, config.address),
            sink,
            delay,
            attention,
            gate,
            config,
            geometry: Geometry::default(),
            calibration: Calibration::default(),
            enabled: false,
            state: DeviceState::Uninitialized,
        }
    }

    /// Create an instance and bring the touchpad up.
    pub fn attach(
        i2c: I2C,
        sink: S,
        delay: DELAY,
        attention: Option<PIN>,
        gate: &'g BusyGate,
        config: IetpConfig,
    ) -> Result<Self, IetpError> {
        let mut touchpad = Self::new(i2c, sink, delay, attention, gate, config);
        touchpad.init()?;
        info!(
            "ietp: Elantech touchpad ({}x{})",
            touchpad.geometry.max_x,
            touchpad.geometry.max_y
        );
        Ok(touchpad)
    }

    /// Disables the touchpad and hands back the bus, the sink and the
    /// attention line.
    pub fn detach(mut self) -> (I2C, S, Option<PIN>) {
        self.enabled = false;
        self.state = DeviceState::Uninitialized;
        (self.dev.release(), self.sink, self.attention)
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn hid(&self) -> Option<&[u8; 16]> {
        self.config.hid.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Reset the chip and switch it to absolute reports.
    ///
    /// Stops at the first failing step; nothing is rolled back.
    pub fn reset(&mut self) -> Result<(), IetpError> {
        self.send_command(Command::Reset).inspect_err(|e| {
            error!("ietp: failed writing reset command: {:?}", e);
        })?;

        // only the transaction matters, the acknowledgement value is not
        let mut ack = [0u8; 2];
        self.dev
            .read_register_buffer(Register::Report.into(), &mut ack)
            .map_err(IetpError::from)
            .inspect_err(|e| {
                error!("ietp: failed reading reset ack: {:?}", e);
            })?;

        self.dev
            .write_register(Register::Control.into(), ReportMode::Absolute.into())
            .map_err(IetpError::from)
            .inspect_err(|e| {
                error!("ietp: failed setting absolute mode: {:?}", e);
            })?;

        self.send_command(Command::Wakeup).inspect_err(|e| {
            error!("ietp: failed writing wakeup command: {:?}", e);
        })?;

        Ok(())
    }

    /// Reset the chip and read back its axis limits and resolution.
    pub fn init(&mut self) -> Result<(), IetpError> {
        self.enabled = false;
        self.state = DeviceState::Resetting;

        match self.configure_from_hardware() {
            Ok(()) => {
                self.state = DeviceState::Configured;
                Ok(())
            }
            Err(e) => {
                self.state = DeviceState::Uninitialized;
                Err(e)
            }
        }
    }

    fn configure_from_hardware(&mut self) -> Result<(), IetpError> {
        self.reset().inspect_err(|_| {
            error!("ietp: failed to reset");
        })?;

        let max_x = self.read_capability(Register::MaxXAxis, "max x")?;
        let max_y = self.read_capability(Register::MaxYAxis, "max y")?;
        let resolution = self.read_capability(Register::Resolution, "resolution")?;

        self.geometry = Geometry::from_registers(max_x, max_y, resolution);
        self.calibration = self.geometry.calibration();
        debug!(
            "ietp: {}x{} at {}x{} dpi",
            self.geometry.max_x,
            self.geometry.max_y,
            self.geometry.res_x,
            self.geometry.res_y
        );
        Ok(())
    }

    fn read_capability(&mut self, reg: Register, name: &str) -> Result<u16, IetpError> {
        self.dev.read_register(reg.into()).map_err(|e| {
            let e = IetpError::from(e);
            error!("ietp: failed reading {}: {:?}", name, e);
            e
        })
    }

    /// Put the chip to sleep. On failure the state is left alone.
    pub fn sleep(&mut self) -> Result<(), IetpError> {
        self.send_command(Command::Sleep).inspect_err(|e| {
            error!("ietp: failed writing sleep command: {:?}", e);
        })?;
        self.state = DeviceState::Sleeping;
        Ok(())
    }

    pub fn suspend(&mut self) -> Result<(), IetpError> {
        self.sleep()
    }

    /// Re-runs [`init`](Self::init) with the gate held. The chip forgets its
    /// configuration when powered down, so nothing cached is trusted.
    pub fn resume(&mut self) -> Result<(), IetpError> {
        let gate = self.gate;
        let _busy = gate
            .acquire_within(&mut self.delay, self.config.enable_timeout_ms)
            .map_err(|_| {
                warn!("ietp: resume timed out waiting for a report");
                IetpError::Busy
            })?;
        self.init()
    }

    /// Registers the touchpad with the input framework.
    ///
    /// Waits a bounded time for an in-flight report; if it does not finish
    /// the input framework is left untouched.
    pub fn enable(&mut self) -> Result<(), IetpError> {
        let gate = self.gate;
        let _busy = gate
            .acquire_within(&mut self.delay, self.config.enable_timeout_ms)
            .map_err(|_| {
                error!("ietp: trying to enable but we're busy");
                IetpError::Busy
            })?;

        debug!("ietp: enabling");
        let hw = touchpad_hw(&self.calibration);
        self.sink.configure(&hw).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "ietp: failed to configure input device: {}",
                defmt::Debug2Format(&e)
            );
            #[cfg(feature = "log-04")]
            log::error!("ietp: failed to configure input device: {:?}", e);
            let _ = e;
            IetpError::Configuration
        })?;

        self.enabled = true;
        self.state = DeviceState::Enabled;
        Ok(())
    }

    pub fn disable(&mut self) {
        debug!("ietp: disabling");
        self.sink.set_mode(InputMode::Compat);
        self.enabled = false;
        if self.state == DeviceState::Enabled {
            self.state = DeviceState::Configured;
        }
    }

    /// Interrupt entry point. Returns immediately if a report is already
    /// being processed.
    pub fn handle_interrupt(&mut self) -> Result<InterruptStatus, IetpError> {
        let gate = self.gate;
        let Some(_busy) = gate.try_acquire() else {
            return Ok(InterruptStatus::Busy);
        };
        self.process_report()
    }

    /// The attention line is active low.
    pub fn is_report_pending(&mut self) -> Result<bool, IetpError> {
        match &mut self.attention {
            Some(pin) => pin.is_low().map_err(|_| IetpError::PinError),
            None => Ok(false),
        }
    }

    /// Services the device if the attention line is asserted.
    pub fn poll(&mut self) -> Result<Option<InterruptStatus>, IetpError> {
        if !self.is_report_pending()? {
            return Ok(None);
        }
        self.handle_interrupt().map(Some)
    }

    fn process_report(&mut self) -> Result<InterruptStatus, IetpError> {
        let mut raw = [0u8; REPORT_LEN];
        self.dev
            .read_register_buffer(Register::Report.into(), &mut raw)
            .map_err(IetpError::from)
            .inspect_err(|e| {
                error!("ietp: failed reading report: {:?}", e);
            })?;

        match parse_report(&raw) {
            Some(report) => {
                dispatch_report(&mut self.sink, &report);
                Ok(InterruptStatus::Processed)
            }
            None => Ok(InterruptStatus::Discarded),
        }
    }

    /// Numeric control channel, see [`ControlCode`](super::ControlCode).
    pub fn control(&mut self, code: u32, arg: ControlArg) -> Result<ControlResponse, IetpError> {
        handle_control(&mut self.sink, &mut self.calibration, code, arg)
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.sink.set_mode(mode);
    }

    fn send_command(&mut self, command: Command) -> Result<(), IetpError> {
        self.dev
            .write_register(Register::Command.into(), command.into())?;
        Ok(())
    }
}
