use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
#[cfg(feature = "time")]
use embassy_time::Duration;

use crate::chip::{ChipInfo, Width};
use crate::link::LinkAggregator;
use crate::phy::{DuplexMode, Speed};
use crate::table::Cursor;
use crate::tag::TailTagCodec;
use crate::{Capability, Error, RegisterTransport};

/// Port control 0: tail tag enable.
const PORT_TAIL_TAG_ENABLE: u8 = 1 << 2;

/// Switch configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Multiplex the line ports over the host link with tail tags.
    ///
    /// When disabled the switch forwards on its own and the host link
    /// follows the first registered port.
    pub tail_tagging: bool,
    /// Register reads before a busy/start bit wait fails with [`Error::Timeout`].
    pub poll_limit: u32,
    /// Speed of the host port link, reported while any line port is up.
    pub host_speed: Speed,
    /// Duplex of the host port link.
    pub host_duplex: DuplexMode,
    /// Dynamic entry aging time in seconds, applied by [`Switch::init`].
    pub aging_time: Option<u32>,
    /// Link polling interval for [`Switch::poll_link`].
    #[cfg(feature = "time")]
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tail_tagging: true,
            poll_limit: 1000,
            host_speed: Speed::_1000,
            host_duplex: DuplexMode::Full,
            aging_time: None,
            #[cfg(feature = "time")]
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Progress of a wait on a self-clearing register bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Idle,
    Started,
    Polling(u32),
    Done(u32),
    TimedOut,
}

/// One physical switch.
///
/// Every operation takes `&mut self`, so a single table transaction is in
/// flight at any time. Use [`SharedSwitch`] to share a switch between
/// several virtual interfaces.
pub struct Switch<T> {
    pub(crate) bus: T,
    pub(crate) chip: &'static ChipInfo,
    pub(crate) config: Config,
    pub(crate) cursor: Cursor,
    pub(crate) links: LinkAggregator,
}

impl<T: RegisterTransport> Switch<T> {
    /// Create a driver for `chip` on `bus`. No bus access happens until [`init`](Self::init).
    pub fn new(bus: T, chip: &'static ChipInfo, config: Config) -> Self {
        Self {
            bus,
            chip,
            config,
            cursor: Cursor::Idle,
            links: LinkAggregator::new(),
        }
    }

    /// Check the chip ID and apply the configuration.
    pub fn init(&mut self) -> Result<(), Error<T::Error>> {
        let id = self.read16(self.chip.id_reg)?;
        if id != self.chip.id {
            error!("unexpected chip id {:#x}, expected {:#x}", id, self.chip.id);
            return Err(Error::WrongIdentifier);
        }

        let ctrl = self.port_addr(self.chip.host_port, self.chip.port_ctrl0);
        let mut val = self.read8(ctrl)?;
        if self.config.tail_tagging {
            val |= PORT_TAIL_TAG_ENABLE;
        } else {
            val &= !PORT_TAIL_TAG_ENABLE;
        }
        self.write8(ctrl, val)?;

        if let Some(secs) = self.config.aging_time {
            self.set_aging_time(secs)?;
        }

        debug!("{} ready, tail tagging {}", self.chip.name, self.config.tail_tagging);
        Ok(())
    }

    /// Register map of this switch.
    pub fn chip(&self) -> &'static ChipInfo {
        self.chip
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tail tag codec for frames crossing the host link.
    ///
    /// Pass-through when tail tagging is disabled.
    pub fn tail_tag(&self) -> TailTagCodec {
        if self.config.tail_tagging {
            TailTagCodec::new(&self.chip.tail_tag)
        } else {
            TailTagCodec::disabled()
        }
    }

    /// Release the bus.
    pub fn release(self) -> T {
        self.bus
    }

    pub(crate) fn port_addr(&self, port: u8, offset: u32) -> u32 {
        u32::from(port) * self.chip.port_stride + offset
    }

    pub(crate) fn check_port(&self, port: u8) -> Result<(), Error<T::Error>> {
        if self.chip.is_valid_port(port) {
            Ok(())
        } else {
            Err(Error::InvalidPort)
        }
    }

    fn regs(&mut self) -> Result<&mut T, Error<T::Error>> {
        match self.bus.capability() {
            Capability::Full => Ok(&mut self.bus),
            Capability::PhyOnly => Err(Error::Unsupported),
        }
    }

    pub(crate) fn read8(&mut self, addr: u32) -> Result<u8, Error<T::Error>> {
        self.regs()?.read8(addr).map_err(Error::Bus)
    }

    pub(crate) fn read16(&mut self, addr: u32) -> Result<u16, Error<T::Error>> {
        self.regs()?.read16(addr).map_err(Error::Bus)
    }

    pub(crate) fn read32(&mut self, addr: u32) -> Result<u32, Error<T::Error>> {
        self.regs()?.read32(addr).map_err(Error::Bus)
    }

    pub(crate) fn write8(&mut self, addr: u32, val: u8) -> Result<(), Error<T::Error>> {
        self.regs()?.write8(addr, val).map_err(Error::Bus)
    }

    pub(crate) fn write16(&mut self, addr: u32, val: u16) -> Result<(), Error<T::Error>> {
        self.regs()?.write16(addr, val).map_err(Error::Bus)
    }

    pub(crate) fn write32(&mut self, addr: u32, val: u32) -> Result<(), Error<T::Error>> {
        self.regs()?.write32(addr, val).map_err(Error::Bus)
    }

    pub(crate) fn read_width(&mut self, width: Width, addr: u32) -> Result<u32, Error<T::Error>> {
        match width {
            Width::U8 => self.read8(addr).map(u32::from),
            Width::U16 => self.read16(addr).map(u32::from),
            Width::U32 => self.read32(addr),
        }
    }

    pub(crate) fn write_width(&mut self, width: Width, addr: u32, val: u32) -> Result<(), Error<T::Error>> {
        match width {
            Width::U8 => self.write8(addr, val as u8),
            Width::U16 => self.write16(addr, val as u16),
            Width::U32 => self.write32(addr, val),
        }
    }

    /// Run `start`, then read `reg` until `done` accepts its value.
    ///
    /// Returns the accepted value, or [`Error::Timeout`] after
    /// `Config::poll_limit` reads.
    pub(crate) fn wait_for<S, D>(&mut self, start: S, reg: u32, width: Width, done: D) -> Result<u32, Error<T::Error>>
    where
        S: FnOnce(&mut Self) -> Result<(), Error<T::Error>>,
        D: Fn(u32) -> bool,
    {
        let limit = self.config.poll_limit;
        let mut start = Some(start);
        let mut state = PollState::Idle;
        loop {
            state = match state {
                PollState::Idle => {
                    if let Some(start) = start.take() {
                        start(self)?;
                    }
                    PollState::Started
                }
                PollState::Started => PollState::Polling(0),
                PollState::Polling(n) if n >= limit => PollState::TimedOut,
                PollState::Polling(n) => {
                    let val = self.read_width(width, reg)?;
                    if done(val) {
                        PollState::Done(val)
                    } else {
                        poll_delay();
                        PollState::Polling(n + 1)
                    }
                }
                PollState::Done(val) => return Ok(val),
                PollState::TimedOut => {
                    warn!("register {:#x} still busy after {} reads", reg, limit);
                    return Err(Error::Timeout);
                }
            }
        }
    }
}

fn poll_delay() {
    #[cfg(feature = "time")]
    embassy_time::block_for(Duration::from_micros(1));
    #[cfg(not(feature = "time"))]
    core::hint::spin_loop();
}

/// A [`Switch`] behind a blocking mutex.
///
/// Virtual interfaces sharing one physical switch go through
/// [`lock`](Self::lock), which holds the mutex for the whole closure, so
/// multi-register sequences never interleave.
pub struct SharedSwitch<M: RawMutex, T> {
    inner: Mutex<M, RefCell<Switch<T>>>,
}

impl<M: RawMutex, T: RegisterTransport> SharedSwitch<M, T> {
    /// Wrap `switch`.
    pub const fn new(switch: Switch<T>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(switch)),
        }
    }

    /// Run `f` with exclusive access to the switch.
    ///
    /// # Panics
    /// Calling `lock` again from inside `f` panics.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Switch<T>) -> R) -> R {
        self.inner.lock(|sw| f(&mut sw.borrow_mut()))
    }

    /// Unwrap the switch.
    pub fn into_inner(self) -> Switch<T> {
        self.inner.into_inner().into_inner()
    }
}
