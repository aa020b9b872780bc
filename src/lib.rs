#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// This must go FIRST so that all the other modules see its macros.
mod fmt;

use crate::phy::regs::C22;

/// Chip register maps
pub mod chip;
mod error;
/// Forwarding database
pub mod fdb;
/// Link polling and virtual ports
pub mod link;
/// Multicast filtering controls
pub mod mcast;
/// MDIO transport
pub mod mdio;
/// Phy
pub mod phy;
/// Port states and port masks
pub mod port;
/// SPI transport
pub mod spi;
mod switch;
/// Table transaction engine
pub mod table;
/// Tail tag codec
pub mod tag;
/// VLAN table
pub mod vlan;

#[cfg(test)]
mod testing;

pub use error::{Error, TagError};
pub use switch::{Config, SharedSwitch, Switch};

/// Which parts of the switch a [`RegisterTransport`] can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capability {
    /// Full switch register space and PHY registers.
    Full,
    /// PHY registers only, through the MDIO bus.
    ///
    /// Switch register reads through such a transport return 0 and writes are
    /// dropped. [`Switch`] checks this up front and fails with
    /// [`Error::Unsupported`] instead.
    PhyOnly,
}

/// Register access to a switch over its control bus.
pub trait RegisterTransport {
    /// `RegisterTransport` error type
    type Error: core::fmt::Debug;

    /// What this transport can reach.
    fn capability(&self) -> Capability {
        Capability::Full
    }

    /// Read an 8-bit switch register.
    fn read8(&mut self, addr: u32) -> Result<u8, Self::Error>;
    /// Read a 16-bit switch register.
    fn read16(&mut self, addr: u32) -> Result<u16, Self::Error>;
    /// Read a 32-bit switch register.
    fn read32(&mut self, addr: u32) -> Result<u32, Self::Error>;
    /// Write an 8-bit switch register.
    fn write8(&mut self, addr: u32, val: u8) -> Result<(), Self::Error>;
    /// Write a 16-bit switch register.
    fn write16(&mut self, addr: u32, val: u16) -> Result<(), Self::Error>;
    /// Write a 32-bit switch register.
    fn write32(&mut self, addr: u32, val: u32) -> Result<(), Self::Error>;

    /// Read a PHY register of `port` directly over the management bus.
    ///
    /// Only used when [`capability`](Self::capability) is [`Capability::PhyOnly`].
    /// The default implementation reads 0.
    fn smi_read(&mut self, port: u8, reg: C22) -> Result<u16, Self::Error> {
        let _ = (port, reg);
        Ok(0)
    }

    /// Write a PHY register of `port` directly over the management bus.
    ///
    /// Only used when [`capability`](Self::capability) is [`Capability::PhyOnly`].
    /// The default implementation drops the write.
    fn smi_write(&mut self, port: u8, reg: C22, val: u16) -> Result<(), Self::Error> {
        let _ = (port, reg, val);
        Ok(())
    }
}

/// Station Management Interface (SMI) on an ethernet PHY
pub trait StationManagement {
    /// `StationManagement` error type
    type Error: core::fmt::Debug;

    /// Read a register over SMI.
    fn smi_read(&mut self, phy_addr: u8, reg: C22) -> Result<u16, Self::Error>;
    /// Write a register over SMI.
    fn smi_write(&mut self, phy_addr: u8, reg: C22, val: u16) -> Result<(), Self::Error>;
}
