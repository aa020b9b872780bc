//! PHY register addresses.
//!
//! Embedded PHYs of the supported switches expose the IEEE 802.3 clause 22
//! register set, either mapped into the port register block or reached
//! through an indirect access window. Clause 45 (MMD) registers are reached
//! through the clause 22 MMD control/data pair.

/// A single MDIO clause 22 register address (5 bits).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct C22(pub u8);

impl C22 {
    /// Basic mode control.
    pub const BMCR: Self = C22(0x00);
    /// Basic mode status.
    pub const BMSR: Self = C22(0x01);
    /// PHY identifier 1.
    pub const PHYSID1: Self = C22(0x02);
    /// PHY identifier 2.
    pub const PHYSID2: Self = C22(0x03);
    /// Auto-negotiation advertisement.
    pub const ADVERTISE: Self = C22(0x04);
    /// Auto-negotiation link partner base page ability.
    pub const LPA: Self = C22(0x05);
    /// MMD Register control.
    pub const MMD_CONTROL: Self = C22(0x0d);
    /// MMD Register address data.
    pub const MMD_DATA: Self = C22(0x0e);
    /// Microchip PHY control register, reports the resolved speed and duplex.
    pub const PHY_CTRL: Self = C22(0x1f);

    /// Creates a new instance of `C22` with a vendor specific register.
    pub const fn vendor_specific<const N: u8>() -> Self {
        assert!(
            N > 0x0f && N < 0x20,
            "Vendor-specific register address must be between 16 and 31"
        );

        C22(N)
    }
}

/// BMSR link status bit. Latched low: a link drop stays visible until read.
pub const BMSR_LINK_STATUS: u16 = 1 << 2;

/// A single MDIO clause 45 device address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mmd(pub u8);

impl Mmd {
    /// Physical Medium Attachment/Dependent.
    pub const PMAPMD: Self = Mmd(1);
    /// Physical coding sublayer.
    pub const PCS: Self = Mmd(3);
    /// Auto negotiation.
    pub const AN: Self = Mmd(7);
    /// Vendor specific 1.
    pub const VEND1: Self = Mmd(30);
    /// Vendor specific 2.
    pub const VEND2: Self = Mmd(31);
}

/// A single MDIO clause 45 register device and address.
///
/// `C45` stores a [`Mmd`] device address and the 16-bit register number
/// inside that device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct C45 {
    pub(crate) devad: Mmd,
    pub(crate) regnum: u16,
}

impl C45 {
    /// Creates a new instance of `C45`.
    pub const fn new(devad: Mmd, regnum: u16) -> Self {
        Self { devad, regnum }
    }
}
