//! Hardware table transactions.
//!
//! All on-chip tables are accessed the same way: the entry is staged in a
//! block of 32-bit data registers, a control word carrying the table
//! selector, action, index and start bit is written, and the start bit is
//! polled until the switch clears it.
//!
//! The dynamic table is only reachable through a hardware search cursor that
//! walks the table in order. It must be started at index 0 and read
//! sequentially; any other table transaction ends the search, since all
//! tables share the data registers.

use crate::chip::{ChipInfo, TableControl, Width};
use crate::{Error, RegisterTransport, Switch};

/// Largest table entry, in 32-bit words.
pub const MAX_TABLE_WORDS: usize = 4;

/// Raw table entry, most significant word first.
pub type TableWords = [u32; MAX_TABLE_WORDS];

/// On-chip table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Table {
    /// Static address table
    Static,
    /// Dynamic (ALU) address table
    Dynamic,
    /// VLAN table
    Vlan,
    /// Reserved multicast table
    ReservedMcast,
}

/// Table action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Read the entry at an index
    Read,
    /// Write the entry at an index
    Write,
    /// Step the dynamic table search cursor
    Search,
}

/// Dynamic table search cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cursor {
    Idle,
    Active { next: u16 },
}

fn control(chip: &ChipInfo, table: Table) -> TableControl {
    match table {
        Table::Static => chip.static_table,
        Table::Dynamic => chip.dynamic_table,
        Table::Vlan => chip.vlan_table,
        Table::ReservedMcast => chip.reserved_mcast,
    }
}

impl<T: RegisterTransport> Switch<T> {
    /// Perform one transaction against `table`.
    ///
    /// - [`Action::Write`] stores `words` at `index`.
    /// - [`Action::Read`] loads the entry at `index` into `words`.
    /// - [`Action::Search`] loads the `index`-th entry of the dynamic table
    ///   into `words`. Index 0 starts a new search, every following call must
    ///   ask for the next index or fails with [`Error::CursorNotStarted`].
    ///   [`Error::EndOfTable`] marks the end of the search.
    ///
    /// Fails with [`Error::EndOfTable`] when `index` is past the table.
    pub fn table_transaction(
        &mut self,
        table: Table,
        action: Action,
        index: u16,
        words: &mut TableWords,
    ) -> Result<(), Error<T::Error>> {
        let tc = control(self.chip, table);
        if index >= tc.capacity {
            if action == Action::Search && self.cursor != Cursor::Idle {
                self.stop_search()?;
            }
            return Err(Error::EndOfTable);
        }

        let op = match action {
            Action::Read => tc.read,
            Action::Write => tc.write,
            Action::Search if table == Table::Dynamic => {
                *words = self.search_next(index)?;
                return Ok(());
            }
            Action::Search => return Err(Error::InvalidParameter),
        };

        if self.cursor != Cursor::Idle {
            debug!("{:?} transaction ends the dynamic table search", table);
            self.stop_search()?;
        }

        if action == Action::Write {
            for (i, word) in words.iter().take(tc.words).enumerate() {
                self.write32(tc.data + 4 * i as u32, *word)?;
            }
        }

        let mut ctrl = tc.select | op | tc.start;
        if tc.index_reg.is_none() {
            ctrl |= (u32::from(index) & tc.index_mask) << tc.index_shift;
        }
        trace!("{:?} {:?} index {} ctrl {:#x}", table, action, index, ctrl);

        self.wait_for(
            |sw| {
                if let Some(reg) = tc.index_reg {
                    sw.write16(reg, index)?;
                }
                sw.write_width(tc.ctrl_width, tc.ctrl, ctrl)
            },
            tc.ctrl,
            tc.ctrl_width,
            |v| v & tc.start == 0,
        )?;

        if action == Action::Read {
            for (i, word) in words.iter_mut().take(tc.words).enumerate() {
                *word = self.read32(tc.data + 4 * i as u32)?;
            }
        }
        Ok(())
    }

    fn search_next(&mut self, index: u16) -> Result<TableWords, Error<T::Error>> {
        let tc = self.chip.dynamic_table;
        match self.cursor {
            _ if index == 0 => {}
            Cursor::Active { next } if next == index => {}
            _ => return Err(Error::CursorNotStarted),
        }

        let restart = index == 0;
        let status = self.wait_for(
            |sw| {
                if restart {
                    sw.write32(tc.ctrl, tc.search | tc.start)
                } else {
                    Ok(())
                }
            },
            tc.ctrl,
            Width::U32,
            |v| v & tc.valid != 0 || v & tc.start == 0,
        );
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                self.cursor = Cursor::Idle;
                return Err(e);
            }
        };

        if status & tc.valid == 0 {
            trace!("dynamic table search ended after {} entries", index);
            self.stop_search()?;
            return Err(Error::EndOfTable);
        }

        let mut words = [0; MAX_TABLE_WORDS];
        for (i, word) in words.iter_mut().take(tc.words).enumerate() {
            match self.read32(tc.data + 4 * i as u32) {
                Ok(val) => *word = val,
                Err(e) => {
                    self.cursor = Cursor::Idle;
                    return Err(e);
                }
            }
        }
        // Reading the entry moves the hardware cursor on.
        self.cursor = Cursor::Active { next: index + 1 };
        Ok(words)
    }

    pub(crate) fn stop_search(&mut self) -> Result<(), Error<T::Error>> {
        self.cursor = Cursor::Idle;
        self.write32(self.chip.dynamic_table.ctrl, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::KSZ9477;
    use crate::fdb::MacAddress;
    use crate::testing::Emulator;
    use crate::Config;

    /// Emulator whose next read of `fail_at` fails.
    struct Flaky {
        emu: Emulator,
        fail_at: Option<u32>,
    }

    impl RegisterTransport for Flaky {
        type Error = ();

        fn read8(&mut self, addr: u32) -> Result<u8, ()> {
            self.emu.read8(addr).map_err(|e| match e {})
        }

        fn read16(&mut self, addr: u32) -> Result<u16, ()> {
            self.emu.read16(addr).map_err(|e| match e {})
        }

        fn read32(&mut self, addr: u32) -> Result<u32, ()> {
            if self.fail_at == Some(addr) {
                self.fail_at = None;
                return Err(());
            }
            self.emu.read32(addr).map_err(|e| match e {})
        }

        fn write8(&mut self, addr: u32, val: u8) -> Result<(), ()> {
            self.emu.write8(addr, val).map_err(|e| match e {})
        }

        fn write16(&mut self, addr: u32, val: u16) -> Result<(), ()> {
            self.emu.write16(addr, val).map_err(|e| match e {})
        }

        fn write32(&mut self, addr: u32, val: u32) -> Result<(), ()> {
            self.emu.write32(addr, val).map_err(|e| match e {})
        }
    }

    fn switch() -> Switch<Emulator> {
        Switch::new(Emulator::new(&KSZ9477), &KSZ9477, Config::default())
    }

    #[test]
    fn static_write_then_read() {
        let mut sw = switch();
        let mut words = [0x8000_0000, 0x0000_0003, 0x0000_0011, 0x2233_4455];
        sw.table_transaction(Table::Static, Action::Write, 5, &mut words).unwrap();
        assert_eq!(sw.bus.static_table[5], words);

        let mut back = [0; MAX_TABLE_WORDS];
        sw.table_transaction(Table::Static, Action::Read, 5, &mut back).unwrap();
        assert_eq!(back, words);
    }

    #[test]
    fn reserved_mcast_is_selected_by_control_word() {
        let mut sw = switch();
        let mut words = [0, 0x41, 0, 0];
        sw.table_transaction(Table::ReservedMcast, Action::Write, 33, &mut words)
            .unwrap();
        assert_eq!(sw.bus.resv_table[33][1], 0x41);
        assert_eq!(sw.bus.static_table.iter().filter(|e| e[0] != 0 || e[1] != 0).count(), 0);
    }

    #[test]
    fn vlan_index_goes_through_index_register() {
        let mut sw = switch();
        let mut words = [0x8000_0001, 0x0000_0001, 0x0000_0043, 0];
        sw.table_transaction(Table::Vlan, Action::Write, 100, &mut words).unwrap();
        assert_eq!(sw.bus.reg16(0x040c), 100);
        assert_eq!(sw.bus.vlan(100), [0x8000_0001, 0x0000_0001, 0x0000_0043]);

        let mut back = [0; MAX_TABLE_WORDS];
        sw.table_transaction(Table::Vlan, Action::Read, 100, &mut back).unwrap();
        assert_eq!(back, words);
    }

    #[test]
    fn index_past_capacity() {
        let mut sw = switch();
        let mut words = [0; MAX_TABLE_WORDS];
        assert_eq!(
            sw.table_transaction(Table::Static, Action::Read, 16, &mut words),
            Err(Error::EndOfTable)
        );
        assert_eq!(sw.bus.writes.len(), 0);
    }

    #[test]
    fn search_only_on_dynamic_table() {
        let mut sw = switch();
        let mut words = [0; MAX_TABLE_WORDS];
        assert_eq!(
            sw.table_transaction(Table::Static, Action::Search, 0, &mut words),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn search_walks_table_in_order() {
        let mut sw = switch();
        sw.bus.learn(1, MacAddress([0, 1, 2, 3, 4, 5]));
        sw.bus.learn(2, MacAddress([0, 1, 2, 3, 4, 6]));

        let mut words = [0; MAX_TABLE_WORDS];
        sw.table_transaction(Table::Dynamic, Action::Search, 0, &mut words).unwrap();
        assert_eq!(words[1], 0x01);
        sw.table_transaction(Table::Dynamic, Action::Search, 1, &mut words).unwrap();
        assert_eq!(words[1], 0x02);
        assert_eq!(
            sw.table_transaction(Table::Dynamic, Action::Search, 2, &mut words),
            Err(Error::EndOfTable)
        );
        assert_eq!(sw.cursor, Cursor::Idle);
    }

    #[test]
    fn search_must_start_at_zero() {
        let mut sw = switch();
        sw.bus.learn(1, MacAddress([0, 1, 2, 3, 4, 5]));
        sw.bus.learn(1, MacAddress([0, 1, 2, 3, 4, 6]));
        sw.bus.learn(1, MacAddress([0, 1, 2, 3, 4, 7]));

        let mut words = [0; MAX_TABLE_WORDS];
        assert_eq!(
            sw.table_transaction(Table::Dynamic, Action::Search, 1, &mut words),
            Err(Error::CursorNotStarted)
        );
        sw.table_transaction(Table::Dynamic, Action::Search, 0, &mut words).unwrap();
        assert_eq!(
            sw.table_transaction(Table::Dynamic, Action::Search, 2, &mut words),
            Err(Error::CursorNotStarted)
        );
        sw.table_transaction(Table::Dynamic, Action::Search, 1, &mut words).unwrap();
        assert_eq!(words[3], 0x0203_0406);
    }

    #[test]
    fn other_transactions_end_the_search() {
        let mut sw = switch();
        sw.bus.learn(1, MacAddress([0, 1, 2, 3, 4, 5]));
        sw.bus.learn(1, MacAddress([0, 1, 2, 3, 4, 6]));

        let mut words = [0; MAX_TABLE_WORDS];
        sw.table_transaction(Table::Dynamic, Action::Search, 0, &mut words).unwrap();
        let mut scratch = [0; MAX_TABLE_WORDS];
        sw.table_transaction(Table::Static, Action::Read, 0, &mut scratch).unwrap();
        assert_eq!(
            sw.table_transaction(Table::Dynamic, Action::Search, 1, &mut words),
            Err(Error::CursorNotStarted)
        );

        // Restarting from 0 yields the first entry again.
        sw.table_transaction(Table::Dynamic, Action::Search, 0, &mut words).unwrap();
        assert_eq!(words[3], 0x0203_0405);
    }

    #[test]
    fn stuck_transaction_times_out() {
        let config = Config {
            poll_limit: 16,
            ..Config::default()
        };
        let mut sw = Switch::new(Emulator::new(&KSZ9477), &KSZ9477, config);
        sw.bus.stuck = Some(0x041c);
        let mut words = [0; MAX_TABLE_WORDS];
        assert_eq!(
            sw.table_transaction(Table::Static, Action::Read, 0, &mut words),
            Err(Error::Timeout)
        );
    }

    #[test]
    fn failed_entry_read_ends_the_search() {
        let mut emu = Emulator::new(&KSZ9477);
        emu.learn(1, MacAddress([0, 1, 2, 3, 4, 5]));
        emu.learn(2, MacAddress([0, 1, 2, 3, 4, 6]));
        let bus = Flaky {
            emu,
            fail_at: Some(KSZ9477.dynamic_table.data + 4),
        };
        let mut sw = Switch::new(bus, &KSZ9477, Config::default());

        let mut words = [0; MAX_TABLE_WORDS];
        assert_eq!(
            sw.table_transaction(Table::Dynamic, Action::Search, 0, &mut words),
            Err(Error::Bus(()))
        );
        assert_eq!(sw.cursor, Cursor::Idle);
        assert_eq!(
            sw.table_transaction(Table::Dynamic, Action::Search, 1, &mut words),
            Err(Error::CursorNotStarted)
        );

        sw.table_transaction(Table::Dynamic, Action::Search, 0, &mut words).unwrap();
        assert_eq!(words[1], 0x01);
        assert_eq!(sw.cursor, Cursor::Active { next: 1 });
    }
}
