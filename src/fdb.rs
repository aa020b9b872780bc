use core::fmt;

use crate::chip::{ChipInfo, Width};
use crate::port::PortMask;
use crate::table::{Action, Cursor, Table, TableWords, MAX_TABLE_WORDS};
use crate::{Error, RegisterTransport, Switch};

const ENTRY_VALID: u32 = 1 << 31;
const ENTRY_OVERRIDE: u32 = 1 << 31;
const ENTRY_PORTS: u32 = 0x7fff_ffff;

/// Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; 6]);

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// Forwarding database entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FdbEntry {
    /// Station address
    pub mac: MacAddress,
    /// Ports frames to `mac` are forwarded to
    pub dest_ports: PortMask,
    /// Port the address was learned on, dynamic entries only
    pub src_port: Option<u8>,
    /// Forward even to ports whose state blocks traffic
    pub port_override: bool,
}

impl FdbEntry {
    /// Static entry forwarding `mac` to `dest_ports`.
    pub const fn new(mac: MacAddress, dest_ports: PortMask) -> Self {
        Self {
            mac,
            dest_ports,
            src_port: None,
            port_override: false,
        }
    }

    fn to_words(self, ports: u32) -> TableWords {
        let m = self.mac.0;
        let mut words = [0; MAX_TABLE_WORDS];
        words[0] = ENTRY_VALID;
        words[1] = ports & ENTRY_PORTS;
        if self.port_override {
            words[1] |= ENTRY_OVERRIDE;
        }
        words[2] = u32::from(u16::from_be_bytes([m[0], m[1]]));
        words[3] = u32::from_be_bytes([m[2], m[3], m[4], m[5]]);
        words
    }

    /// Decode a table record. Only the chip's port bits of the forwarding
    /// word are kept, the rest carry flags such as the FID select.
    fn from_words(words: &TableWords, chip: &ChipInfo) -> Self {
        let hi = (words[2] as u16).to_be_bytes();
        let lo = words[3].to_be_bytes();
        Self {
            mac: MacAddress([hi[0], hi[1], lo[0], lo[1], lo[2], lo[3]]),
            dest_ports: PortMask(words[1] & chip.all_ports()),
            src_port: None,
            port_override: words[1] & ENTRY_OVERRIDE != 0,
        }
    }
}

fn is_valid(words: &TableWords) -> bool {
    words[0] & ENTRY_VALID != 0
}

/// Forwarding database.
impl<T: RegisterTransport> Switch<T> {
    /// Store a static entry and return its index.
    ///
    /// An entry for the same MAC address is updated in place, otherwise the
    /// first free slot is used. [`PortMask::HOST`] selects the host port.
    pub fn add_static_fdb_entry(&mut self, entry: FdbEntry) -> Result<u16, Error<T::Error>> {
        let capacity = self.chip.static_table.capacity;
        let mut free = None;
        let mut found = None;
        let mut words = [0; MAX_TABLE_WORDS];
        for index in 0..capacity {
            self.table_transaction(Table::Static, Action::Read, index, &mut words)?;
            if !is_valid(&words) {
                free = free.or(Some(index));
            } else if FdbEntry::from_words(&words, self.chip).mac == entry.mac {
                found = Some(index);
                break;
            }
        }

        let Some(index) = found.or(free) else {
            warn!("static table full, dropping {}", entry.mac);
            return Err(Error::TableFull);
        };
        let mut words = entry.to_words(entry.dest_ports.to_hw(self.chip));
        self.table_transaction(Table::Static, Action::Write, index, &mut words)?;
        debug!("static entry {} -> {:#x} at {}", entry.mac, words[1], index);
        Ok(index)
    }

    /// Remove the static entry for `mac`.
    pub fn delete_static_fdb_entry(&mut self, mac: MacAddress) -> Result<(), Error<T::Error>> {
        let mut words = [0; MAX_TABLE_WORDS];
        for index in 0..self.chip.static_table.capacity {
            self.table_transaction(Table::Static, Action::Read, index, &mut words)?;
            if is_valid(&words) && FdbEntry::from_words(&words, self.chip).mac == mac {
                let mut empty = [0; MAX_TABLE_WORDS];
                self.table_transaction(Table::Static, Action::Write, index, &mut empty)?;
                debug!("static entry {} removed from {}", mac, index);
                return Ok(());
            }
        }
        Err(Error::NotFound)
    }

    /// Static entry at `index`.
    ///
    /// The destination ports are the raw port bits, the host port shows up as
    /// its port number.
    pub fn get_static_fdb_entry(&mut self, index: u16) -> Result<FdbEntry, Error<T::Error>> {
        let mut words = [0; MAX_TABLE_WORDS];
        self.table_transaction(Table::Static, Action::Read, index, &mut words)?;
        if !is_valid(&words) {
            return Err(Error::InvalidEntry);
        }
        Ok(FdbEntry::from_words(&words, self.chip))
    }

    /// Invalidate every static entry.
    pub fn flush_static_fdb_table(&mut self) -> Result<(), Error<T::Error>> {
        for index in 0..self.chip.static_table.capacity {
            let mut empty = [0; MAX_TABLE_WORDS];
            self.table_transaction(Table::Static, Action::Write, index, &mut empty)?;
        }
        debug!("static table flushed");
        Ok(())
    }

    /// The `index`-th learned entry.
    ///
    /// Entries can only be read in order: index 0 starts a new walk of the
    /// dynamic table and each following call must ask for the next index.
    /// [`Error::EndOfTable`] ends the walk.
    pub fn get_dynamic_fdb_entry(&mut self, index: u16) -> Result<FdbEntry, Error<T::Error>> {
        let mut words = [0; MAX_TABLE_WORDS];
        self.table_transaction(Table::Dynamic, Action::Search, index, &mut words)?;
        let mut entry = FdbEntry::from_words(&words, self.chip);
        let ports = entry.dest_ports.bits();
        if ports != 0 {
            entry.src_port = Some(ports.trailing_zeros() as u8 + 1);
        }
        Ok(entry)
    }

    /// Drop learned entries, of one port or of the whole table.
    ///
    /// Flushing a single port disables learning on it for the duration of
    /// the flush and restores its state afterwards.
    pub fn flush_dynamic_fdb_table(&mut self, port: Option<u8>) -> Result<(), Error<T::Error>> {
        if let Some(port) = port {
            self.check_port(port)?;
        }
        if self.cursor != Cursor::Idle {
            self.stop_search()?;
        }
        match port {
            Some(port) => {
                let bit = self.chip.flush.learn_disabled;
                self.with_learning_disabled(port, |sw| sw.flush(bit))?;
                debug!("dynamic entries of port {} flushed", port);
            }
            None => {
                self.flush(self.chip.flush.all)?;
                debug!("dynamic table flushed");
            }
        }
        Ok(())
    }

    fn flush(&mut self, bit: u8) -> Result<(), Error<T::Error>> {
        let fc = self.chip.flush;
        let opt = self.read8(fc.option_reg)?;
        self.write8(fc.option_reg, (opt & !fc.option_mask) | fc.option_dynamic)?;

        let ctrl = self.read8(fc.ctrl_reg)?;
        self.wait_for(
            |sw| sw.write8(fc.ctrl_reg, ctrl | bit),
            fc.ctrl_reg,
            Width::U8,
            |v| v & u32::from(bit) == 0,
        )?;
        Ok(())
    }

    /// Set the aging time of learned entries.
    ///
    /// The hardware counts in ticks; `secs` is rounded up to the next tick
    /// and clamped to the largest period the chip supports.
    pub fn set_aging_time(&mut self, secs: u32) -> Result<(), Error<T::Error>> {
        let aging = self.chip.aging;
        let ticks = secs.div_ceil(aging.tick_secs).min(aging.max_ticks());
        self.write8(aging.period, ticks as u8)?;
        if let Some(ext) = aging.ext {
            let val = self.read8(ext.reg)?;
            let hi = ((ticks >> 8) as u8) << ext.shift;
            self.write8(ext.reg, (val & !ext.mask) | (hi & ext.mask))?;
        }
        debug!("aging time {} s", ticks * aging.tick_secs);
        Ok(())
    }

    /// Aging time of learned entries in seconds.
    pub fn aging_time(&mut self) -> Result<u32, Error<T::Error>> {
        let aging = self.chip.aging;
        let mut ticks = u32::from(self.read8(aging.period)?);
        if let Some(ext) = aging.ext {
            let val = self.read8(ext.reg)?;
            ticks |= u32::from((val & ext.mask) >> ext.shift) << 8;
        }
        Ok(ticks * aging.tick_secs)
    }
}
