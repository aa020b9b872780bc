use embedded_hal::spi::{Operation, SpiDevice};

use crate::chip::{ChipInfo, SpiFormat};
use crate::RegisterTransport;

/// Switch register access over SPI.
///
/// Each access is one chip-select framed transaction: the command word
/// (opcode and address) followed by the big-endian data.
pub struct SpiTransport<SPI> {
    spi: SPI,
    format: SpiFormat,
}

impl<SPI: SpiDevice> SpiTransport<SPI> {
    /// Transport for `chip` on `spi`.
    pub fn new(spi: SPI, chip: &ChipInfo) -> Self {
        Self { spi, format: chip.spi }
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    fn command(&self, opcode: u32, addr: u32) -> ([u8; 4], usize) {
        let f = &self.format;
        let word = (opcode << f.opcode_shift) | ((addr & f.addr_mask) << f.addr_shift);
        (word.to_be_bytes(), 4 - f.len)
    }

    fn read(&mut self, addr: u32, data: &mut [u8]) -> Result<(), SPI::Error> {
        let (cmd, skip) = self.command(self.format.read, addr);
        self.spi
            .transaction(&mut [Operation::Write(&cmd[skip..]), Operation::Read(data)])
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), SPI::Error> {
        let (cmd, skip) = self.command(self.format.write, addr);
        self.spi
            .transaction(&mut [Operation::Write(&cmd[skip..]), Operation::Write(data)])
    }
}

impl<SPI: SpiDevice> RegisterTransport for SpiTransport<SPI> {
    type Error = SPI::Error;

    fn read8(&mut self, addr: u32) -> Result<u8, Self::Error> {
        let mut buf = [0; 1];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn read16(&mut self, addr: u32) -> Result<u16, Self::Error> {
        let mut buf = [0; 2];
        self.read(addr, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read32(&mut self, addr: u32) -> Result<u32, Self::Error> {
        let mut buf = [0; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn write8(&mut self, addr: u32, val: u8) -> Result<(), Self::Error> {
        self.write(addr, &[val])
    }

    fn write16(&mut self, addr: u32, val: u16) -> Result<(), Self::Error> {
        self.write(addr, &val.to_be_bytes())
    }

    fn write32(&mut self, addr: u32, val: u32) -> Result<(), Self::Error> {
        self.write(addr, &val.to_be_bytes())
    }
}
