//! 16-bit register access over I2C.
//!
//! Register addresses and values travel little-endian. Each access is a
//! single bus transaction, so a shared bus (see `embedded-hal-bus`) is held
//! for exactly one register access and released again when it fails.

use embedded_hal::i2c::I2c;

#[derive(Debug)]
pub struct BlockingRegisterDevice<I2C> {
    i2c: I2C,
    pub adr: u8,
}

impl<I2C> BlockingRegisterDevice<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, adr: u8) -> Self {
        Self { i2c, adr }
    }

    /// Writes the register address, then reads `buffer.len()` bytes back.
    pub fn read_register_buffer(&mut self, reg: u16, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.i2c.write_read(self.adr, &reg.to_le_bytes(), buffer)
    }

    pub fn read_register(&mut self, reg: u16) -> Result<u16, I2C::Error> {
        let mut buffer = [0u8; 2];
        self.read_register_buffer(reg, &mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    pub fn write_register(&mut self, reg: u16, value: u16) -> Result<(), I2C::Error> {
        self.i2c.write(self.adr, &register_write_payload(reg, value))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &I2C {
        &self.i2c
    }
}

#[cfg(feature = "async")]
#[derive(Debug)]
pub struct AsyncRegisterDevice<I2C> {
    i2c: I2C,
    pub adr: u8,
}

#[cfg(feature = "async")]
impl<I2C> AsyncRegisterDevice<I2C>
where
    I2C: embedded_hal_async::i2c::I2c,
{
    pub fn new(i2c: I2C, adr: u8) -> Self {
        Self { i2c, adr }
    }

    pub async fn read_register_buffer(
        &mut self,
        reg: u16,
        buffer: &mut [u8],
    ) -> Result<(), I2C::Error> {
        self.i2c.write_read(self.adr, &reg.to_le_bytes(), buffer).await
    }

    pub async fn read_register(&mut self, reg: u16) -> Result<u16, I2C::Error> {
        let mut buffer = [0u8; 2];
        self.read_register_buffer(reg, &mut buffer).await?;
        Ok(u16::from_le_bytes(buffer))
    }

    pub async fn write_register(&mut self, reg: u16, value: u16) -> Result<(), I2C::Error> {
        self.i2c
            .write(self.adr, &register_write_payload(reg, value))
            .await
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Address then value, both little-endian.
fn register_write_payload(reg: u16, value: u16) -> [u8; 4] {
    let [reg_lo, reg_hi] = reg.to_le_bytes();
    let [val_lo, val_hi] = value.to_le_bytes();
    [reg_lo, reg_hi, val_lo, val_hi]
}
