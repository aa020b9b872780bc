use crate::phy::regs::C22;
use crate::{Capability, RegisterTransport, StationManagement};

/// PHY-only access to a switch over its MDIO interface.
///
/// The switch answers clause 22 frames for its embedded PHYs at PHY address
/// = port number, but the switch register space is not reachable this way.
/// Register reads through this transport return 0 and writes are dropped;
/// [`Switch`](crate::Switch) reports [`Error::Unsupported`](crate::Error::Unsupported)
/// for operations that need them.
pub struct MdioTransport<S> {
    sm: S,
}

impl<S: StationManagement> MdioTransport<S> {
    /// Transport over `sm`.
    pub fn new(sm: S) -> Self {
        Self { sm }
    }

    /// The underlying bus.
    pub fn inner(&self) -> &S {
        &self.sm
    }

    /// The underlying bus, mutably.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.sm
    }

    /// Release the bus.
    pub fn release(self) -> S {
        self.sm
    }
}

impl<S: StationManagement> RegisterTransport for MdioTransport<S> {
    type Error = S::Error;

    fn capability(&self) -> Capability {
        Capability::PhyOnly
    }

    fn read8(&mut self, addr: u32) -> Result<u8, Self::Error> {
        trace!("mdio: register read {:#x} not reachable", addr);
        Ok(0)
    }

    fn read16(&mut self, addr: u32) -> Result<u16, Self::Error> {
        trace!("mdio: register read {:#x} not reachable", addr);
        Ok(0)
    }

    fn read32(&mut self, addr: u32) -> Result<u32, Self::Error> {
        trace!("mdio: register read {:#x} not reachable", addr);
        Ok(0)
    }

    fn write8(&mut self, addr: u32, _val: u8) -> Result<(), Self::Error> {
        trace!("mdio: register write {:#x} dropped", addr);
        Ok(())
    }

    fn write16(&mut self, addr: u32, _val: u16) -> Result<(), Self::Error> {
        trace!("mdio: register write {:#x} dropped", addr);
        Ok(())
    }

    fn write32(&mut self, addr: u32, _val: u32) -> Result<(), Self::Error> {
        trace!("mdio: register write {:#x} dropped", addr);
        Ok(())
    }

    fn smi_read(&mut self, port: u8, reg: C22) -> Result<u16, Self::Error> {
        self.sm.smi_read(port, reg)
    }

    fn smi_write(&mut self, port: u8, reg: C22, val: u16) -> Result<(), Self::Error> {
        self.sm.smi_write(port, reg, val)
    }
}
