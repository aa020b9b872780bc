use core::ops::{BitOr, BitOrAssign};

use crate::chip::ChipInfo;
use crate::{Error, RegisterTransport, Switch};

const PORT_TX_ENABLE: u8 = 1 << 2;
const PORT_RX_ENABLE: u8 = 1 << 1;
const PORT_LEARN_DISABLE: u8 = 1 << 0;
const PORT_STATE_MASK: u8 = PORT_TX_ENABLE | PORT_RX_ENABLE | PORT_LEARN_DISABLE;

/// Set of switch ports. Bit `n - 1` selects port `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortMask(pub u32);

impl PortMask {
    /// No port.
    pub const EMPTY: Self = PortMask(0);
    /// The host port, whichever port number it has on the chip.
    pub const HOST: Self = PortMask(1 << 31);

    /// Mask with only `port` set. Port 0 gives an empty mask.
    pub const fn port(port: u8) -> Self {
        if port == 0 || port > 31 {
            Self::EMPTY
        } else {
            PortMask(1 << (port - 1))
        }
    }

    /// This mask plus `port`.
    pub const fn with(self, port: u8) -> Self {
        PortMask(self.0 | Self::port(port).0)
    }

    /// Whether `port` is in the mask.
    pub const fn contains(self, port: u8) -> bool {
        let bit = Self::port(port).0;
        bit != 0 && self.0 & bit != 0
    }

    /// Whether the mask is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Add `port` to the mask.
    pub fn insert(&mut self, port: u8) {
        *self = self.with(port);
    }

    /// Port numbers in the mask, lowest first. [`HOST`](Self::HOST) is not a port number and is skipped.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (1..=31u8).filter(move |&p| self.contains(p))
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Register value for `chip`: [`HOST`](Self::HOST) becomes the host port bit,
    /// bits of ports the chip lacks are dropped.
    pub(crate) const fn to_hw(self, chip: &ChipInfo) -> u32 {
        let mut bits = self.0 & !Self::HOST.0;
        if self.0 & Self::HOST.0 != 0 {
            bits |= Self::port(chip.host_port).0;
        }
        bits & chip.all_ports()
    }
}

impl BitOr for PortMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        PortMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for PortMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Spanning tree forwarding state of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortState {
    /// No transmit, no receive, no learning
    Disabled,
    /// Receive BPDUs only, no learning
    Listening,
    /// Receive and learn, no transmit
    Learning,
    /// Normal operation
    Forwarding,
    /// The register holds a combination with no defined state
    Unknown,
}

impl PortState {
    const fn bits(self) -> Option<u8> {
        match self {
            PortState::Disabled => Some(PORT_LEARN_DISABLE),
            PortState::Listening => Some(PORT_RX_ENABLE | PORT_LEARN_DISABLE),
            PortState::Learning => Some(PORT_RX_ENABLE),
            PortState::Forwarding => Some(PORT_TX_ENABLE | PORT_RX_ENABLE),
            PortState::Unknown => None,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & PORT_STATE_MASK {
            PORT_LEARN_DISABLE => PortState::Disabled,
            0x03 => PortState::Listening,
            PORT_RX_ENABLE => PortState::Learning,
            0x06 => PortState::Forwarding,
            _ => PortState::Unknown,
        }
    }

    /// Whether spanning tree moves a port from `self` to `next` directly.
    pub const fn can_transition_to(self, next: PortState) -> bool {
        matches!(
            (self, next),
            (_, PortState::Disabled)
                | (PortState::Disabled, PortState::Listening)
                | (PortState::Disabled, PortState::Forwarding)
                | (PortState::Listening, PortState::Learning)
                | (PortState::Learning, PortState::Forwarding)
        )
    }
}

impl<T: RegisterTransport> Switch<T> {
    /// Set the forwarding state of `port`.
    ///
    /// Only the transmit, receive and learning-disable bits change.
    /// Transitions that spanning tree would not make are applied as well.
    pub fn set_port_state(&mut self, port: u8, state: PortState) -> Result<(), Error<T::Error>> {
        self.check_port(port)?;
        let Some(bits) = state.bits() else {
            return Err(Error::InvalidParameter);
        };

        let addr = self.port_addr(port, self.chip.mstp_state);
        let val = self.read8(addr)?;
        let current = PortState::from_bits(val);
        if current != state && !current.can_transition_to(state) {
            warn!("port {}: irregular transition {:?} -> {:?}", port, current, state);
        }
        self.write8(addr, (val & !PORT_STATE_MASK) | bits)?;
        debug!("port {}: {:?}", port, state);
        Ok(())
    }

    /// Forwarding state of `port`.
    pub fn get_port_state(&mut self, port: u8) -> Result<PortState, Error<T::Error>> {
        self.check_port(port)?;
        let addr = self.port_addr(port, self.chip.mstp_state);
        Ok(PortState::from_bits(self.read8(addr)?))
    }

    /// Run `f` with learning disabled on `port`.
    ///
    /// The port's original state is written back afterwards, whether `f`
    /// succeeds or not. An error from `f` takes precedence over one from the
    /// restore.
    pub fn with_learning_disabled<R>(
        &mut self,
        port: u8,
        f: impl FnOnce(&mut Self) -> Result<R, Error<T::Error>>,
    ) -> Result<R, Error<T::Error>> {
        self.check_port(port)?;
        let addr = self.port_addr(port, self.chip.mstp_state);
        let saved = self.read8(addr)?;

        let result = match self.write8(addr, saved | PORT_LEARN_DISABLE) {
            Ok(()) => f(self),
            Err(e) => Err(e),
        };
        let restored = self.write8(addr, saved);

        let value = result?;
        restored?;
        Ok(value)
    }
}
