use crate::port::PortMask;
use crate::table::{Action, Table, MAX_TABLE_WORDS};
use crate::{Error, RegisterTransport, Switch};

const SNOOP_IGMP: u8 = 1 << 6;
const SNOOP_MLD: u8 = 1 << 2;
const LUE_RESERVED_MCAST: u8 = 1 << 2;
const UNKNOWN_MCAST_FWD: u32 = 1 << 31;

impl<T: RegisterTransport> Switch<T> {
    /// Trap IGMP frames to the host port.
    pub fn enable_igmp_snooping(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        self.update8(self.chip.snoop_ctrl, SNOOP_IGMP, enable)
    }

    /// Trap MLD frames to the host port.
    pub fn enable_mld_snooping(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        self.update8(self.chip.snoop_ctrl, SNOOP_MLD, enable)
    }

    /// Look up reserved multicast groups (01:80:c2:00:00:xx) in the reserved multicast table.
    pub fn enable_reserved_mcast_table(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        self.update8(self.chip.lue_ctrl0, LUE_RESERVED_MCAST, enable)
    }

    /// Forward reserved multicast `group` to `ports`.
    pub fn set_reserved_mcast_ports(&mut self, group: u8, ports: PortMask) -> Result<(), Error<T::Error>> {
        let mut words = [0; MAX_TABLE_WORDS];
        words[1] = ports.to_hw(self.chip);
        self.table_transaction(Table::ReservedMcast, Action::Write, u16::from(group), &mut words)?;
        debug!("reserved multicast group {}: {:#x}", group, words[1]);
        Ok(())
    }

    /// Ports reserved multicast `group` is forwarded to.
    pub fn reserved_mcast_ports(&mut self, group: u8) -> Result<PortMask, Error<T::Error>> {
        let mut words = [0; MAX_TABLE_WORDS];
        self.table_transaction(Table::ReservedMcast, Action::Read, u16::from(group), &mut words)?;
        Ok(PortMask(words[1] & self.chip.all_ports()))
    }

    /// Forward multicast frames with no table entry to `ports` instead of flooding them.
    pub fn set_unknown_mcast_fwd_ports(&mut self, enable: bool, ports: PortMask) -> Result<(), Error<T::Error>> {
        let reg = self.chip.unknown_mcast_ctrl;
        let val = self.read32(reg)?;
        let mut new = val & !(UNKNOWN_MCAST_FWD | self.chip.all_ports());
        if enable {
            new |= UNKNOWN_MCAST_FWD | ports.to_hw(self.chip);
        }
        self.write32(reg, new)
    }
}
