use crate::chip::{PhyAccess, SpeedSource, Width};
use crate::phy::regs::{BMSR_LINK_STATUS, C22, C45};
use crate::{Capability, Error, RegisterTransport, Switch};

pub mod regs;

#[allow(dead_code)]
#[repr(u16)]
enum Reg13Op {
    Addr = 0b00 << 14,
    Write = 0b01 << 14,
    PostReadIncAddr = 0b10 << 14,
    Read = 0b11 << 14,
}
const DEV_MASK: u8 = 0x1f;

/// Link Speed
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 10 MBit
    _10,
    /// 100 MBit
    _100,
    /// 1000 MBit
    _1000,
}

impl Speed {
    /// Speed in Mbit/s.
    pub const fn mbps(self) -> u32 {
        match self {
            Speed::_10 => 10,
            Speed::_100 => 100,
            Speed::_1000 => 1000,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Duplex
pub enum DuplexMode {
    /// Full
    Full,
    /// Half
    Half,
}

/// Link Status
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Link Down
    Down,
    /// Link Up with `Speed` and `Duplex`
    Up {
        /// Link speed
        speed: Speed,
        /// Link Duplex
        duplex: DuplexMode,
    },
}

impl LinkStatus {
    /// Is link up
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up { speed: _, duplex: _ })
    }
    /// Is link down
    pub fn is_down(&self) -> bool {
        matches!(self, Self::Down)
    }
}

/// Embedded PHY access.
impl<T: RegisterTransport> Switch<T> {
    /// Read a clause 22 register of the PHY behind `port`.
    pub fn read_phy(&mut self, port: u8, reg: C22) -> Result<u16, Error<T::Error>> {
        if !self.chip.has_phy(port) {
            return Err(Error::InvalidPort);
        }
        if self.bus.capability() == Capability::PhyOnly {
            return self.bus.smi_read(port, reg).map_err(Error::Bus);
        }

        match self.chip.phy {
            PhyAccess::Mapped { base } => self.read16(self.port_addr(port, base + 2 * u32::from(reg.0))),
            PhyAccess::Indirect {
                addr,
                data,
                ctrl,
                busy,
                base,
                ..
            } => {
                let target = indirect_addr(port, base, reg);
                self.write16(addr, target)?;
                self.wait_for(
                    |sw| sw.write16(ctrl, busy),
                    ctrl,
                    Width::U16,
                    |v| v & u32::from(busy) == 0,
                )?;
                self.read16(data)
            }
        }
    }

    /// Write a clause 22 register of the PHY behind `port`.
    pub fn write_phy(&mut self, port: u8, reg: C22, val: u16) -> Result<(), Error<T::Error>> {
        if !self.chip.has_phy(port) {
            return Err(Error::InvalidPort);
        }
        if self.bus.capability() == Capability::PhyOnly {
            return self.bus.smi_write(port, reg, val).map_err(Error::Bus);
        }

        match self.chip.phy {
            PhyAccess::Mapped { base } => self.write16(self.port_addr(port, base + 2 * u32::from(reg.0)), val),
            PhyAccess::Indirect {
                addr,
                data,
                ctrl,
                busy,
                write,
                base,
            } => {
                let target = indirect_addr(port, base, reg);
                self.write16(addr, target)?;
                self.write16(data, val)?;
                self.wait_for(
                    |sw| sw.write16(ctrl, busy | write),
                    ctrl,
                    Width::U16,
                    |v| v & u32::from(busy) == 0,
                )?;
                Ok(())
            }
        }
    }

    /// Read, Clause 45, through the clause 22 MMD control/data registers.
    pub fn read_mmd(&mut self, port: u8, reg: C45) -> Result<u16, Error<T::Error>> {
        let devad = u16::from(reg.devad.0 & DEV_MASK);

        // Write FN
        self.write_phy(port, C22::MMD_CONTROL, (Reg13Op::Addr as u16) | devad)?;
        // Write Addr
        self.write_phy(port, C22::MMD_DATA, reg.regnum)?;

        // Write FN
        self.write_phy(port, C22::MMD_CONTROL, (Reg13Op::Read as u16) | devad)?;
        self.read_phy(port, C22::MMD_DATA)
    }

    /// Write, Clause 45, through the clause 22 MMD control/data registers.
    pub fn write_mmd(&mut self, port: u8, reg: C45, val: u16) -> Result<(), Error<T::Error>> {
        let devad = u16::from(reg.devad.0 & DEV_MASK);

        // Write FN
        self.write_phy(port, C22::MMD_CONTROL, (Reg13Op::Addr as u16) | devad)?;
        // Write Addr
        self.write_phy(port, C22::MMD_DATA, reg.regnum)?;

        // Write FN
        self.write_phy(port, C22::MMD_CONTROL, (Reg13Op::Write as u16) | devad)?;
        self.write_phy(port, C22::MMD_DATA, val)
    }

    /// Current link state of `port`.
    ///
    /// BMSR latches link failures, so the first read may report a drop that
    /// already recovered. The second read returns the present state.
    pub fn link_up(&mut self, port: u8) -> Result<bool, Error<T::Error>> {
        self.read_phy(port, C22::BMSR)?;
        let bmsr = self.read_phy(port, C22::BMSR)?;
        Ok(bmsr & BMSR_LINK_STATUS != 0)
    }

    /// Negotiated speed and duplex of `port`.
    pub fn link_mode(&mut self, port: u8) -> Result<(Speed, DuplexMode), Error<T::Error>> {
        match self.chip.speed {
            SpeedSource::Fixed { speed, duplex } => Ok((speed, duplex)),
            SpeedSource::Phy {
                reg,
                gbit,
                fast,
                full_duplex,
            } => {
                let val = self.read_phy(port, reg)?;
                let speed = if val & gbit != 0 {
                    Speed::_1000
                } else if val & fast != 0 {
                    Speed::_100
                } else {
                    Speed::_10
                };
                let duplex = if val & full_duplex != 0 {
                    DuplexMode::Full
                } else {
                    DuplexMode::Half
                };
                Ok((speed, duplex))
            }
        }
    }
}

fn indirect_addr(port: u8, base: u16, reg: C22) -> u16 {
    (u16::from(port) << 12) | base | (u16::from(reg.0) << 2)
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::{vec, vec::Vec};

    use core::convert::Infallible;

    use super::*;
    use crate::chip::{KSZ9477, LAN9370};
    use crate::mdio::MdioTransport;
    use crate::phy::regs::Mmd;
    use crate::testing::Emulator;
    use crate::{Config, StationManagement};

    #[derive(Debug, PartialEq)]
    enum A {
        Read(u8, C22),
        Write(u8, C22, u16),
    }

    struct MockMdioBus(Vec<A>);

    impl MockMdioBus {
        pub fn clear(&mut self) {
            self.0.clear();
        }
    }

    impl StationManagement for MockMdioBus {
        type Error = Infallible;

        fn smi_read(&mut self, phy_addr: u8, reg: C22) -> Result<u16, Self::Error> {
            self.0.push(A::Read(phy_addr, reg));
            Ok(0)
        }

        fn smi_write(&mut self, phy_addr: u8, reg: C22, val: u16) -> Result<(), Self::Error> {
            self.0.push(A::Write(phy_addr, reg, val));
            Ok(())
        }
    }

    fn mdio_switch() -> Switch<MdioTransport<MockMdioBus>> {
        let bus = MdioTransport::new(MockMdioBus(Vec::with_capacity(20)));
        Switch::new(bus, &KSZ9477, Config::default())
    }

    #[test]
    fn mmd_read_over_mdio() {
        let mut sw = mdio_switch();

        assert_eq!(sw.read_mmd(0x01, C45::new(Mmd(0xBB), 0x1234)), Ok(0));
        assert_eq!(
            sw.bus.inner().0,
            vec![
                #[allow(clippy::identity_op)]
                A::Write(0x01, C22::MMD_CONTROL, (0b00 << 14) | 27),
                A::Write(0x01, C22::MMD_DATA, 0x1234),
                A::Write(0x01, C22::MMD_CONTROL, (0b11 << 14) | 27),
                A::Read(0x01, C22::MMD_DATA)
            ]
        );
    }

    #[test]
    fn mmd_write_over_mdio() {
        let mut sw = mdio_switch();

        sw.bus.inner_mut().clear();
        assert_eq!(sw.write_mmd(0x02, C45::new(Mmd(0xBB), 0x3456), 0xCDEF), Ok(()));
        assert_eq!(
            sw.bus.inner().0,
            vec![
                A::Write(0x02, C22::MMD_CONTROL, 27),
                A::Write(0x02, C22::MMD_DATA, 0x3456),
                A::Write(0x02, C22::MMD_CONTROL, (0b01 << 14) | 27),
                A::Write(0x02, C22::MMD_DATA, 0xCDEF)
            ]
        );
    }

    #[test]
    fn phy_access_rejects_ports_without_phy() {
        let mut sw = mdio_switch();
        assert_eq!(sw.read_phy(6, C22::BMSR), Err(Error::InvalidPort));
        assert_eq!(sw.write_phy(0, C22::BMCR, 0), Err(Error::InvalidPort));
        assert!(sw.bus.inner().0.is_empty());
    }

    #[test]
    fn mapped_phy_registers() {
        let mut sw = Switch::new(Emulator::new(&KSZ9477), &KSZ9477, Config::default());
        sw.write_phy(3, C22::ADVERTISE, 0x01e1).unwrap();
        assert_eq!(sw.bus.phy(3, C22::ADVERTISE), 0x01e1);
        assert_eq!(sw.read_phy(3, C22::ADVERTISE), Ok(0x01e1));
    }

    #[test]
    fn indirect_phy_registers() {
        let mut sw = Switch::new(Emulator::new(&LAN9370), &LAN9370, Config::default());
        sw.write_phy(2, C22::BMCR, 0x2100).unwrap();
        assert_eq!(sw.bus.phy(2, C22::BMCR), 0x2100);
        assert_eq!(sw.read_phy(2, C22::BMCR), Ok(0x2100));
        assert_eq!(sw.bus.reg16(0x075c), 0x2100);
    }

    #[test]
    fn indirect_phy_busy_times_out() {
        let config = Config {
            poll_limit: 8,
            ..Config::default()
        };
        let mut sw = Switch::new(Emulator::new(&LAN9370), &LAN9370, config);
        sw.bus.stuck = Some(0x0768);
        assert_eq!(sw.read_phy(1, C22::BMSR), Err(Error::Timeout));
    }

    #[test]
    fn latched_link_failure_is_read_through() {
        let mut sw = Switch::new(Emulator::new(&KSZ9477), &KSZ9477, Config::default());
        sw.bus.set_link(1, true);
        sw.bus.latch_link_failure(1);
        assert_eq!(sw.link_up(1), Ok(true));
        assert_eq!(sw.link_up(2), Ok(false));
    }

    #[test]
    fn negotiated_link_mode() {
        let mut sw = Switch::new(Emulator::new(&KSZ9477), &KSZ9477, Config::default());
        sw.bus.set_phy(1, C22::PHY_CTRL, (1 << 5) | (1 << 3));
        assert_eq!(sw.link_mode(1), Ok((Speed::_100, DuplexMode::Full)));
        sw.bus.set_phy(1, C22::PHY_CTRL, 1 << 6);
        assert_eq!(sw.link_mode(1), Ok((Speed::_1000, DuplexMode::Half)));

        let mut sw = Switch::new(Emulator::new(&LAN9370), &LAN9370, Config::default());
        assert_eq!(sw.link_mode(4), Ok((Speed::_100, DuplexMode::Full)));
    }
}
