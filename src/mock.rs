//! Test doubles for the bus, delay, attention line and input framework.

use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital;
use embedded_hal::i2c::{self, ErrorKind, Operation, SevenBitAddress};

use crate::gate::BusyGuard;
use crate::input::{Buttons, DeviceType, InputMode, InputSink, TouchpadHw};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Write(u8, Vec<u8>),
    /// Register address written, number of bytes read back.
    WriteRead(u8, Vec<u8>, usize),
}

/// Register-file I2C device. Reads return whatever was stored for the
/// 16-bit address that was written first, zero padded.
#[derive(Debug, Default)]
pub struct MockI2c {
    registers: Vec<(u16, Vec<u8>)>,
    transactions: Vec<Transaction>,
    fail_at: Option<usize>,
}

impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&mut self, reg: u16, data: &[u8]) {
        self.registers.retain(|(r, _)| *r != reg);
        self.registers.push((reg, data.to_vec()));
    }

    /// Fails the `index`th transaction (0 based) with `ErrorKind::Other`.
    pub fn fail_at(&mut self, index: usize) {
        self.fail_at = Some(index);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn execute(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        let index = self.transactions.len();
        let transaction = match operations {
            [Operation::Write(bytes)] => Transaction::Write(address, bytes.to_vec()),
            [Operation::Write(cmd), Operation::Read(buffer)] => {
                let transaction = Transaction::WriteRead(address, cmd.to_vec(), buffer.len());
                if self.fail_at != Some(index) {
                    let reg = match cmd.len() {
                        2 => u16::from_le_bytes([cmd[0], cmd[1]]),
                        _ => u16::from(cmd[0]),
                    };
                    buffer.fill(0);
                    if let Some((_, data)) = self.registers.iter().find(|(r, _)| *r == reg) {
                        let n = data.len().min(buffer.len());
                        buffer[..n].copy_from_slice(&data[..n]);
                    }
                }
                transaction
            }
            _ => panic!("unexpected i2c operations"),
        };
        self.transactions.push(transaction);

        if self.fail_at == Some(index) {
            Err(ErrorKind::Other)
        } else {
            Ok(())
        }
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl i2c::I2c<SevenBitAddress> for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.execute(address, operations)
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::i2c::I2c<SevenBitAddress> for MockI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.execute(address, operations)
    }
}

/// Delay that only counts, and can drop a held gate after a while.
#[derive(Debug, Default)]
pub struct MockDelay<'a> {
    elapsed_ns: u64,
    release: Option<(BusyGuard<'a>, u64)>,
}

impl<'a> MockDelay<'a> {
    pub fn new() -> Self {
        Self {
            elapsed_ns: 0,
            release: None,
        }
    }

    /// Drops `guard` once `after_ms` have elapsed.
    pub fn releasing(mut self, guard: Option<BusyGuard<'a>>, after_ms: u32) -> Self {
        self.release = guard.map(|guard| (guard, u64::from(after_ms) * 1_000_000));
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }

    fn advance(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
        if matches!(self.release, Some((_, at)) if self.elapsed_ns >= at) {
            self.release = None;
        }
    }
}

impl DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns);
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::delay::DelayNs for MockDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.advance(ns);
    }
}

#[derive(Debug)]
pub struct MockPin {
    high: bool,
}

impl MockPin {
    pub fn new(high: bool) -> Self {
        Self { high }
    }

    pub fn set_high(&mut self, high: bool) {
        self.high = high;
    }
}

impl digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::digital::Wait for MockPin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        self.high = !self.high;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    MtState(u8, u16, u16, u8),
    Buttons(Buttons),
    Sync,
    SetMode(InputMode),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    pub configured: Option<TouchpadHw>,
    pub reject_configure: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSink for RecordingSink {
    type Error = ();

    fn configure(&mut self, hw: &TouchpadHw) -> Result<(), Self::Error> {
        if self.reject_configure {
            return Err(());
        }
        self.configured = Some(*hw);
        Ok(())
    }

    fn mt_state(&mut self, slot: u8, x: u16, y: u16, pressure: u8) {
        self.events.push(SinkEvent::MtState(slot, x, y, pressure));
    }

    fn buttons(&mut self, buttons: Buttons) {
        self.events.push(SinkEvent::Buttons(buttons));
    }

    fn sync(&mut self) {
        self.events.push(SinkEvent::Sync);
    }

    fn set_mode(&mut self, mode: InputMode) {
        self.events.push(SinkEvent::SetMode(mode));
    }

    fn device_type(&self) -> DeviceType {
        self.configured
            .map_or(DeviceType::Unknown, |hw| hw.device_type)
    }
}
