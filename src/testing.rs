//! Register-level switch model for unit tests.

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use crate::chip::{ChipInfo, PhyAccess};
use crate::fdb::MacAddress;
use crate::phy::regs::{BMSR_LINK_STATUS, C22};
use crate::{RegisterTransport, StationManagement};

const BMSR_DEFAULT: u16 = 0x7949;
const PHYSID1_DEFAULT: u16 = 0x0022;
const MSTP_DEFAULT: u8 = 0x06;
const SEARCH_END: u32 = 1 << 5;

/// Emulates the registers and tables of one chip.
pub(crate) struct Emulator {
    chip: &'static ChipInfo,
    regs: BTreeMap<u32, u8>,
    pub static_table: Vec<[u32; 4]>,
    pub resv_table: Vec<[u32; 4]>,
    vlans: BTreeMap<u16, [u32; 3]>,
    dynamic: Vec<[u32; 4]>,
    search: Option<usize>,
    phys: BTreeMap<(u8, u8), u16>,
    links: u32,
    latched: u32,
    /// Register whose hardware side effects never run, so busy bits stay set.
    pub stuck: Option<u32>,
    pub reads: usize,
    pub writes: Vec<(u32, u32)>,
}

impl Emulator {
    pub fn new(chip: &'static ChipInfo) -> Self {
        let mut emu = Self {
            chip,
            regs: BTreeMap::new(),
            static_table: vec![[0; 4]; usize::from(chip.static_table.capacity)],
            resv_table: vec![[0; 4]; usize::from(chip.reserved_mcast.capacity)],
            vlans: BTreeMap::new(),
            dynamic: Vec::new(),
            search: None,
            phys: BTreeMap::new(),
            links: 0,
            latched: 0,
            stuck: None,
            reads: 0,
            writes: Vec::new(),
        };
        emu.store(chip.id_reg, u32::from(chip.id), 2);
        for port in 1..=chip.ports {
            emu.set_mstp(port, MSTP_DEFAULT);
        }
        emu
    }

    fn store(&mut self, addr: u32, val: u32, len: u32) {
        for i in 0..len {
            let shift = 8 * (len - 1 - i);
            self.regs.insert(addr + i, (val >> shift) as u8);
        }
    }

    fn load(&self, addr: u32, len: u32) -> u32 {
        (0..len).fold(0, |acc, i| (acc << 8) | u32::from(*self.regs.get(&(addr + i)).unwrap_or(&0)))
    }

    pub fn reg8(&self, addr: u32) -> u8 {
        self.load(addr, 1) as u8
    }

    pub fn reg16(&self, addr: u32) -> u16 {
        self.load(addr, 2) as u16
    }

    pub fn reg32(&self, addr: u32) -> u32 {
        self.load(addr, 4)
    }

    pub fn set_reg8(&mut self, addr: u32, val: u8) {
        self.store(addr, u32::from(val), 1);
    }

    pub fn vlan(&self, vid: u16) -> [u32; 3] {
        self.vlans.get(&vid).copied().unwrap_or_default()
    }

    /// Add a learned entry for `mac` on `port`.
    pub fn learn(&mut self, port: u8, mac: MacAddress) {
        let m = mac.0;
        self.dynamic.push([
            0,
            1 << (port - 1),
            u32::from(u16::from_be_bytes([m[0], m[1]])),
            u32::from_be_bytes([m[2], m[3], m[4], m[5]]),
        ]);
    }

    fn mstp_addr(&self, port: u8) -> u32 {
        u32::from(port) * self.chip.port_stride + self.chip.mstp_state
    }

    pub fn mstp(&self, port: u8) -> u8 {
        self.reg8(self.mstp_addr(port))
    }

    pub fn set_mstp(&mut self, port: u8, val: u8) {
        self.store(self.mstp_addr(port), u32::from(val), 1);
    }

    pub fn phy(&self, port: u8, reg: C22) -> u16 {
        self.phys.get(&(port, reg.0)).copied().unwrap_or(0)
    }

    pub fn set_phy(&mut self, port: u8, reg: C22, val: u16) {
        self.phys.insert((port, reg.0), val);
    }

    pub fn set_link(&mut self, port: u8, up: bool) {
        if up {
            self.links |= 1 << port;
        } else {
            self.links &= !(1 << port);
        }
    }

    /// Record a link drop that BMSR reports once.
    pub fn latch_link_failure(&mut self, port: u8) {
        self.latched |= 1 << port;
    }

    fn phy_read(&mut self, port: u8, reg: u8) -> u16 {
        if reg == C22::BMSR.0 {
            let up = self.links & (1 << port) != 0 && self.latched & (1 << port) == 0;
            self.latched &= !(1 << port);
            return if up { BMSR_DEFAULT | BMSR_LINK_STATUS } else { BMSR_DEFAULT };
        }
        match self.phys.get(&(port, reg)) {
            Some(&val) => val,
            None if reg == C22::PHYSID1.0 => PHYSID1_DEFAULT,
            None => 0,
        }
    }

    fn mapped_phy(&self, addr: u32) -> Option<(u8, u8)> {
        let PhyAccess::Mapped { base } = self.chip.phy else {
            return None;
        };
        let port = (addr / self.chip.port_stride) as u8;
        let offset = addr % self.chip.port_stride;
        if self.chip.has_phy(port) && (base..base + 0x40).contains(&offset) {
            Some((port, ((offset - base) / 2) as u8))
        } else {
            None
        }
    }

    fn on_read(&mut self, addr: u32, len: u32) -> u32 {
        self.reads += 1;
        if self.stuck == Some(addr) {
            return self.load(addr, len);
        }

        if len == 2 {
            if let Some((port, reg)) = self.mapped_phy(addr) {
                return u32::from(self.phy_read(port, reg));
            }
        }

        let dt = self.chip.dynamic_table;
        if addr == dt.ctrl {
            if let Some(pos) = self.search {
                return match self.dynamic.get(pos).copied() {
                    Some(entry) => {
                        for (i, word) in entry.iter().enumerate() {
                            self.store(dt.data + 4 * i as u32, *word, 4);
                        }
                        dt.search | dt.start | dt.valid
                    }
                    None => {
                        self.search = None;
                        self.store(addr, SEARCH_END, 4);
                        SEARCH_END
                    }
                };
            }
        }

        let val = self.load(addr, len);
        if let Some(pos) = self.search {
            if addr == dt.data + 4 * (dt.words as u32 - 1) {
                self.search = Some(pos + 1);
            }
        }
        val
    }

    fn on_write(&mut self, addr: u32, val: u32, len: u32) {
        self.writes.push((addr, val));
        self.store(addr, val, len);
        if self.stuck == Some(addr) {
            return;
        }

        if len == 2 {
            if let Some((port, reg)) = self.mapped_phy(addr) {
                self.set_phy(port, C22(reg), val as u16);
                return;
            }
        }

        let chip = self.chip;
        let st = chip.static_table;
        let dt = chip.dynamic_table;
        let vt = chip.vlan_table;
        if addr == st.ctrl && val & st.start != 0 {
            let resv = val & chip.reserved_mcast.select != 0;
            let tc = if resv { chip.reserved_mcast } else { st };
            let index = ((val >> tc.index_shift) & tc.index_mask) as usize;
            let read = val & tc.read != 0;
            let mut entry = if resv { self.resv_table[index] } else { self.static_table[index] };
            if read {
                for (i, word) in entry.iter().enumerate() {
                    self.store(tc.data + 4 * i as u32, *word, 4);
                }
            } else {
                for (i, word) in entry.iter_mut().enumerate() {
                    *word = self.load(tc.data + 4 * i as u32, 4);
                }
                if resv {
                    self.resv_table[index] = entry;
                } else {
                    self.static_table[index] = entry;
                }
            }
            self.store(addr, val & !st.start, len);
        } else if addr == dt.ctrl {
            if val == 0 {
                self.search = None;
            } else if val & dt.start != 0 && val & 0x03 == dt.search {
                self.search = Some(0);
            }
        } else if addr == vt.ctrl && val & vt.start != 0 {
            let vid = self.reg16(vt.index_reg.unwrap_or(0));
            if val & 0x03 == vt.read {
                let entry = self.vlan(vid);
                for (i, word) in entry.iter().enumerate() {
                    self.store(vt.data + 4 * i as u32, *word, 4);
                }
            } else if val & 0x03 == vt.write {
                let mut entry = [0; 3];
                for (i, word) in entry.iter_mut().enumerate() {
                    *word = self.load(vt.data + 4 * i as u32, 4);
                }
                self.vlans.insert(vid, entry);
            }
            self.store(addr, val & !vt.start, len);
        } else if addr == chip.flush.ctrl_reg {
            let fc = chip.flush;
            let bits = val as u8;
            if bits & fc.all != 0 {
                self.dynamic.clear();
            }
            if bits & fc.learn_disabled != 0 {
                let disabled: Vec<u8> = (1..=chip.ports).filter(|&p| self.mstp(p) & 0x01 != 0).collect();
                self.dynamic.retain(|e| {
                    let port = e[1].trailing_zeros() as u8 + 1;
                    !disabled.contains(&port)
                });
            }
            self.store(addr, u32::from(bits & !(fc.all | fc.learn_disabled)), len);
        } else if let PhyAccess::Indirect {
            addr: addr_reg,
            data,
            ctrl,
            busy,
            write,
            base,
        } = chip.phy
        {
            if addr == ctrl && val as u16 & busy != 0 {
                let target = self.reg16(addr_reg);
                let port = (target >> 12) as u8;
                let reg = ((target & 0x0fff & !base) >> 2) as u8;
                if val as u16 & write != 0 {
                    let v = self.reg16(data);
                    self.set_phy(port, C22(reg), v);
                } else {
                    let v = self.phy_read(port, reg);
                    self.store(data, u32::from(v), 2);
                }
                self.store(addr, 0, len);
            }
        }
    }
}

impl RegisterTransport for Emulator {
    type Error = Infallible;

    fn read8(&mut self, addr: u32) -> Result<u8, Self::Error> {
        Ok(self.on_read(addr, 1) as u8)
    }

    fn read16(&mut self, addr: u32) -> Result<u16, Self::Error> {
        Ok(self.on_read(addr, 2) as u16)
    }

    fn read32(&mut self, addr: u32) -> Result<u32, Self::Error> {
        Ok(self.on_read(addr, 4))
    }

    fn write8(&mut self, addr: u32, val: u8) -> Result<(), Self::Error> {
        self.on_write(addr, u32::from(val), 1);
        Ok(())
    }

    fn write16(&mut self, addr: u32, val: u16) -> Result<(), Self::Error> {
        self.on_write(addr, u32::from(val), 2);
        Ok(())
    }

    fn write32(&mut self, addr: u32, val: u32) -> Result<(), Self::Error> {
        self.on_write(addr, val, 4);
        Ok(())
    }
}

/// MDIO bus with nothing but default PHY registers behind it.
pub(crate) struct NullMdio;

impl StationManagement for NullMdio {
    type Error = Infallible;

    fn smi_read(&mut self, _phy_addr: u8, reg: C22) -> Result<u16, Self::Error> {
        Ok(if reg == C22::PHYSID1 { PHYSID1_DEFAULT } else { 0 })
    }

    fn smi_write(&mut self, _phy_addr: u8, _reg: C22, _val: u16) -> Result<(), Self::Error> {
        Ok(())
    }
}
