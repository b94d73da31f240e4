use super::{
    dispatch_report, handle_control, parse_report, touchpad_hw, Command, ControlArg,
    ControlResponse, DeviceState, Geometry, IetpConfig, IetpError, InterruptStatus, Register,
    ReportMode, REPORT_LEN,
};
use crate::gate::BusyGate;
use crate::input::{Calibration, InputMode, InputSink};
use crate::AsyncRegisterDevice;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::I2c;

#[derive(Debug)]
pub struct IetpAsync<'g, I2C, S, DELAY, PIN> {
    dev: AsyncRegisterDevice<I2C>,
    sink: S,
    delay: DELAY,
    attention: PIN,
    gate: &'g BusyGate,
    config: IetpConfig,
    geometry: Geometry,
    calibration: Calibration,
    enabled: bool,
    state: DeviceState,
}

impl<'g, I2C, S, DELAY, PIN> IetpAsync<'g, I2C, S, DELAY, PIN>
where
    I2C: I2c,
    S: InputSink,
    DELAY: DelayNs,
    PIN: Wait,
{
    pub fn new(
        i2c: I2C,
        sink: S,
        delay: DELAY,
        attention: PIN,
        gate: &'g BusyGate,
        config: IetpConfig,
    ) -> Self {
        Self {
            dev: AsyncRegisterDevice::new(i2c, config.address),
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

    pub async fn attach(
        i2c: I2C,
        sink: S,
        delay: DELAY,
        attention: PIN,
        gate: &'g BusyGate,
        config: IetpConfig,
    ) -> Result<Self, IetpError> {
        let mut touchpad = Self::new(i2c, sink, delay, attention, gate, config);
        touchpad.init().await?;
        info!(
            "ietp: Elantech touchpad ({}x{})",
            touchpad.geometry.max_x,
            touchpad.geometry.max_y
        );
        Ok(touchpad)
    }

    pub fn detach(self) -> (I2C, S, PIN) {
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

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn reset(&mut self) -> Result<(), IetpError> {
        self.send_command(Command::Reset).await.inspect_err(|e| {
            error!("ietp: failed writing reset command: {:?}", e);
        })?;

        let mut ack = [0u8; 2];
        self.dev
            .read_register_buffer(Register::Report.into(), &mut ack)
            .await
            .map_err(IetpError::from)
            .inspect_err(|e| {
                error!("ietp: failed reading reset ack: {:?}", e);
            })?;

        self.dev
            .write_register(Register::Control.into(), ReportMode::Absolute.into())
            .await
            .map_err(IetpError::from)
            .inspect_err(|e| {
                error!("ietp: failed setting absolute mode: {:?}", e);
            })?;

        self.send_command(Command::Wakeup).await.inspect_err(|e| {
            error!("ietp: failed writing wakeup command: {:?}", e);
        })?;

        Ok(())
    }

    pub async fn init(&mut self) -> Result<(), IetpError> {
        self.enabled = false;
        self.state = DeviceState::Resetting;

        let result = self.configure_from_hardware().await;
        self.state = match result {
            Ok(()) => DeviceState::Configured,
            Err(_) => DeviceState::Uninitialized,
        };
        result
    }

    async fn configure_from_hardware(&mut self) -> Result<(), IetpError> {
        self.reset().await.inspect_err(|_| {
            error!("ietp: failed to reset");
        })?;

        let max_x = self.read_capability(Register::MaxXAxis, "max x").await?;
        let max_y = self.read_capability(Register::MaxYAxis, "max y").await?;
        let resolution = self
            .read_capability(Register::Resolution, "resolution")
            .await?;

        self.geometry = Geometry::from_registers(max_x, max_y, resolution);
        self.calibration = self.geometry.calibration();
        Ok(())
    }

    async fn read_capability(&mut self, reg: Register, name: &str) -> Result<u16, IetpError> {
        self.dev.read_register(reg.into()).await.map_err(|e| {
            let e = IetpError::from(e);
            error!("ietp: failed reading {}: {:?}", name, e);
            e
        })
    }

    pub async fn sleep(&mut self) -> Result<(), IetpError> {
        self.send_command(Command::Sleep).await.inspect_err(|e| {
            error!("ietp: failed writing sleep command: {:?}", e);
        })?;
        self.state = DeviceState::Sleeping;
        Ok(())
    }

    pub async fn suspend(&mut self) -> Result<(), IetpError> {
        self.sleep().await
    }

    pub async fn resume(&mut self) -> Result<(), IetpError> {
        let gate = self.gate;
        let _busy = gate
            .acquire_within_async(&mut self.delay, self.config.enable_timeout_ms)
            .await
            .map_err(|_| {
                warn!("ietp: resume timed out waiting for a report");
                IetpError::Busy
            })?;
        self.init().await
    }

    pub async fn enable(&mut self) -> Result<(), IetpError> {
        let gate = self.gate;
        let _busy = gate
            .acquire_within_async(&mut self.delay, self.config.enable_timeout_ms)
            .await
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

    pub async fn handle_interrupt(&mut self) -> Result<InterruptStatus, IetpError> {
        let gate = self.gate;
        let Some(_busy) = gate.try_acquire() else {
            return Ok(InterruptStatus::Busy);
        };

        let mut raw = [0u8; REPORT_LEN];
        self.dev
            .read_register_buffer(Register::Report.into(), &mut raw)
            .await
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

    /// Waits for the attention line to go low, then services the report.
    pub async fn wait_for_report(&mut self) -> Result<InterruptStatus, IetpError> {
        self.attention
            .wait_for_low()
            .await
            .map_err(|_| IetpError::PinError)?;
        self.handle_interrupt().await
    }

    pub fn control(&mut self, code: u32, arg: ControlArg) -> Result<ControlResponse, IetpError> {
        handle_control(&mut self.sink, &mut self.calibration, code, arg)
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    async fn send_command(&mut self, command: Command) -> Result<(), IetpError> {
        self.dev
            .write_register(Register::Command.into(), command.into())
            .await?;
        Ok(())
    }
}
