use core::task::Context;

#[cfg(feature = "time")]
use embassy_time::Timer;
#[cfg(feature = "time")]
use futures_util::FutureExt;

use crate::phy::{DuplexMode, LinkStatus, Speed};
use crate::{Error, RegisterTransport, Switch};

/// Number of virtual ports one switch can carry.
pub const MAX_VIRTUAL_PORTS: usize = 8;

/// Virtual port returned by [`Switch::register_port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortHandle(u8);

impl PortHandle {
    /// Registration order, starting at 0.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interface a link change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interface {
    /// Link between the host MAC and the switch
    Host,
    /// A virtual port
    Port(PortHandle),
}

/// Receives link changes from [`Switch::poll_links`].
pub trait LinkHandler {
    /// `interface` changed to `status`.
    fn link_changed(&mut self, interface: Interface, status: LinkStatus);

    /// The host link came up: program the host MAC for `speed` and `duplex`.
    fn configure_mac(&mut self, speed: Speed, duplex: DuplexMode);
}

#[derive(Debug, Clone, Copy)]
struct VirtualPort {
    port: u8,
    status: LinkStatus,
}

/// Virtual port registry and last reported link states.
pub(crate) struct LinkAggregator {
    ports: heapless::Vec<VirtualPort, MAX_VIRTUAL_PORTS>,
    host: LinkStatus,
}

impl LinkAggregator {
    pub(crate) const fn new() -> Self {
        Self {
            ports: heapless::Vec::new(),
            host: LinkStatus::Down,
        }
    }

    fn find(&self, port: u8) -> Option<PortHandle> {
        self.ports.iter().position(|vp| vp.port == port).map(|i| PortHandle(i as u8))
    }
}

impl<T: RegisterTransport> Switch<T> {
    /// Expose line `port` as a virtual interface.
    ///
    /// Fails with [`Error::InvalidPort`] for the host port or a port without
    /// an embedded PHY, [`Error::InvalidParameter`] if `port` is already
    /// registered and [`Error::TableFull`] once [`MAX_VIRTUAL_PORTS`] ports
    /// are registered.
    pub fn register_port(&mut self, port: u8) -> Result<PortHandle, Error<T::Error>> {
        if port == self.chip.host_port || !self.chip.has_phy(port) {
            return Err(Error::InvalidPort);
        }
        if self.links.find(port).is_some() {
            return Err(Error::InvalidParameter);
        }

        let handle = PortHandle(self.links.ports.len() as u8);
        self.links
            .ports
            .push(VirtualPort {
                port,
                status: LinkStatus::Down,
            })
            .map_err(|_| Error::TableFull)?;
        debug!("port {} registered as virtual port {}", port, handle.0);
        Ok(handle)
    }

    /// Switch port behind `handle`.
    pub fn port_number(&self, handle: PortHandle) -> Option<u8> {
        self.links.ports.get(handle.index()).map(|vp| vp.port)
    }

    /// Virtual port receiving frames from switch port `port`.
    pub fn route(&self, port: u8) -> Option<PortHandle> {
        self.links.find(port)
    }

    /// Last polled link state of `handle`.
    pub fn port_status(&self, handle: PortHandle) -> LinkStatus {
        self.links
            .ports
            .get(handle.index())
            .map_or(LinkStatus::Down, |vp| vp.status)
    }

    /// Last polled state of the host link.
    pub fn host_link(&self) -> LinkStatus {
        self.links.host
    }

    /// Poll every registered port and report changes to `handler`.
    ///
    /// With tail tagging the host link is up while any line port is up, at
    /// the configured host speed. Without it, the host link follows the first
    /// registered port. Returns the host link state.
    pub fn poll_links<H: LinkHandler>(&mut self, handler: &mut H) -> Result<LinkStatus, Error<T::Error>> {
        for i in 0..self.links.ports.len() {
            let port = self.links.ports[i].port;
            let status = if self.link_up(port)? {
                let (speed, duplex) = self.link_mode(port)?;
                LinkStatus::Up { speed, duplex }
            } else {
                LinkStatus::Down
            };

            if status != self.links.ports[i].status {
                self.links.ports[i].status = status;
                info!("port {}: {:?}", port, status);
                handler.link_changed(Interface::Port(PortHandle(i as u8)), status);
            }
        }

        let host = if self.config.tail_tagging {
            if self.links.ports.iter().any(|vp| vp.status.is_up()) {
                LinkStatus::Up {
                    speed: self.config.host_speed,
                    duplex: self.config.host_duplex,
                }
            } else {
                LinkStatus::Down
            }
        } else {
            self.links.ports.first().map_or(LinkStatus::Down, |vp| vp.status)
        };

        if host != self.links.host {
            if let (LinkStatus::Down, LinkStatus::Up { speed, duplex }) = (self.links.host, host) {
                handler.configure_mac(speed, duplex);
            }
            self.links.host = host;
            info!("host link: {:?}", host);
            handler.link_changed(Interface::Host, host);
        }
        Ok(host)
    }

    /// [`poll_links`](Self::poll_links) for use from a driver's poll
    /// function: schedules the next wakeup of `cx` after
    /// `Config::poll_interval`, or immediately without the `time` feature.
    pub fn poll_link<H: LinkHandler>(&mut self, handler: &mut H, cx: &mut Context) -> Result<LinkStatus, Error<T::Error>> {
        #[cfg(not(feature = "time"))]
        cx.waker().wake_by_ref();

        #[cfg(feature = "time")]
        let _ = Timer::after(self.config.poll_interval).poll_unpin(cx);

        self.poll_links(handler)
    }
}
