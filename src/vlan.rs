use crate::port::PortMask;
use crate::table::{Action, Table, MAX_TABLE_WORDS};
use crate::{Error, RegisterTransport, Switch};

const VLAN_VALID: u32 = 1 << 31;
const VLAN_FID_MASK: u32 = 0x7f;
const LUE_VLAN_ENABLE: u8 = 1 << 7;

/// Largest VLAN ID.
pub const MAX_VID: u16 = 4095;

/// VLAN table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VlanEntry {
    /// VLAN ID
    pub vid: u16,
    /// Filtering ID, selects the address table partition
    pub fid: u8,
    /// Member ports
    pub members: PortMask,
    /// Members that send frames of this VLAN untagged
    pub untagged: PortMask,
}

impl<T: RegisterTransport> Switch<T> {
    /// Write `entry` to the VLAN table. [`PortMask::HOST`] selects the host port.
    pub fn set_vlan_entry(&mut self, entry: VlanEntry) -> Result<(), Error<T::Error>> {
        if entry.vid > MAX_VID || u32::from(entry.fid) > VLAN_FID_MASK {
            return Err(Error::InvalidParameter);
        }
        let mut words = [0; MAX_TABLE_WORDS];
        words[0] = VLAN_VALID | u32::from(entry.fid);
        words[1] = entry.untagged.to_hw(self.chip);
        words[2] = entry.members.to_hw(self.chip);
        self.table_transaction(Table::Vlan, Action::Write, entry.vid, &mut words)?;
        debug!("vlan {}: members {:#x} untagged {:#x}", entry.vid, words[2], words[1]);
        Ok(())
    }

    /// VLAN table entry for `vid`.
    pub fn get_vlan_entry(&mut self, vid: u16) -> Result<VlanEntry, Error<T::Error>> {
        if vid > MAX_VID {
            return Err(Error::InvalidParameter);
        }
        let mut words = [0; MAX_TABLE_WORDS];
        self.table_transaction(Table::Vlan, Action::Read, vid, &mut words)?;
        if words[0] & VLAN_VALID == 0 {
            return Err(Error::InvalidEntry);
        }
        Ok(VlanEntry {
            vid,
            fid: (words[0] & VLAN_FID_MASK) as u8,
            members: PortMask(words[2]),
            untagged: PortMask(words[1]),
        })
    }

    /// Invalidate the VLAN table entry for `vid`.
    pub fn delete_vlan_entry(&mut self, vid: u16) -> Result<(), Error<T::Error>> {
        if vid > MAX_VID {
            return Err(Error::InvalidParameter);
        }
        let mut words = [0; MAX_TABLE_WORDS];
        self.table_transaction(Table::Vlan, Action::Write, vid, &mut words)
    }

    /// Forward by VLAN table membership instead of ignoring VLAN tags.
    pub fn enable_vlan_filtering(&mut self, enable: bool) -> Result<(), Error<T::Error>> {
        self.update8(self.chip.lue_ctrl0, LUE_VLAN_ENABLE, enable)
    }

    pub(crate) fn update8(&mut self, addr: u32, bits: u8, set: bool) -> Result<(), Error<T::Error>> {
        let val = self.read8(addr)?;
        let new = if set { val | bits } else { val & !bits };
        if new != val {
            self.write8(addr, new)?;
        }
        Ok(())
    }
}
