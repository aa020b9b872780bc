//! Per-chip register maps.
//!
//! Every supported switch runs the same protocols with different register
//! offsets, table sizes and tag layouts. A [`ChipInfo`] value carries those
//! differences and is passed to [`Switch::new`](crate::Switch::new).

use crate::phy::regs::C22;
use crate::phy::{DuplexMode, Speed};

/// Register width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    /// 8 bits
    U8,
    /// 16 bits
    U16,
    /// 32 bits
    U32,
}

/// SPI command phase layout.
///
/// The command word is `(opcode << opcode_shift) | ((addr & addr_mask) << addr_shift)`,
/// sent big-endian using its last `len` bytes.
#[derive(Debug, Clone, Copy)]
pub struct SpiFormat {
    /// Read opcode
    pub read: u32,
    /// Write opcode
    pub write: u32,
    /// Opcode position
    pub opcode_shift: u8,
    /// Address position
    pub addr_shift: u8,
    /// Address bits
    pub addr_mask: u32,
    /// Command length in bytes
    pub len: usize,
}

/// How the embedded PHY registers are reached.
#[derive(Debug, Clone, Copy)]
pub enum PhyAccess {
    /// PHY register `r` of port `p` is a 16-bit switch register at
    /// `p * port_stride + base + 2 * r`.
    Mapped {
        /// Offset of PHY register 0 in the port block
        base: u32,
    },
    /// Two-phase access window: the encoded address
    /// `(port << 12) | base | (r << 2)` goes to `addr`, data through `data`,
    /// and the transfer runs while `busy` is set in `ctrl`.
    Indirect {
        /// Address register (16-bit)
        addr: u32,
        /// Data register (16-bit)
        data: u32,
        /// Control register (16-bit)
        ctrl: u32,
        /// Self-clearing busy bit
        busy: u16,
        /// Write direction bit
        write: u16,
        /// Offset of PHY register 0 in the encoded address
        base: u16,
    },
}

/// Where the negotiated speed and duplex of a line port come from.
#[derive(Debug, Clone, Copy)]
pub enum SpeedSource {
    /// Resolved speed/duplex bits in a vendor PHY register.
    Phy {
        /// Status register
        reg: C22,
        /// 1000 Mb/s bit
        gbit: u16,
        /// 100 Mb/s bit
        fast: u16,
        /// Full duplex bit
        full_duplex: u16,
    },
    /// Single-speed PHYs (100BASE-T1).
    Fixed {
        /// Link speed
        speed: Speed,
        /// Link duplex
        duplex: DuplexMode,
    },
}

/// Control register layout of one on-chip table.
#[derive(Debug, Clone, Copy)]
pub struct TableControl {
    /// Control register (selector, action, index, start)
    pub ctrl: u32,
    /// Width of the control register
    pub ctrl_width: Width,
    /// Separate 16-bit index register, for tables that keep the index out of the control word
    pub index_reg: Option<u32>,
    /// Index position in the control word
    pub index_shift: u8,
    /// Index bits
    pub index_mask: u32,
    /// Table selector bits
    pub select: u32,
    /// Read action
    pub read: u32,
    /// Write action
    pub write: u32,
    /// Search action
    pub search: u32,
    /// Self-clearing start/finish bit
    pub start: u32,
    /// Entry-ready flag during a search
    pub valid: u32,
    /// First data register; the entry occupies `words` consecutive 32-bit registers
    pub data: u32,
    /// Entry size in 32-bit words
    pub words: usize,
    /// Number of entries
    pub capacity: u16,
}

/// Dynamic table flush controls.
#[derive(Debug, Clone, Copy)]
pub struct FlushControl {
    /// Flush option register
    pub option_reg: u32,
    /// Flush option field
    pub option_mask: u8,
    /// "Dynamic entries only" option value
    pub option_dynamic: u8,
    /// Flush trigger register
    pub ctrl_reg: u32,
    /// Flush entries of learning-disabled ports
    pub learn_disabled: u8,
    /// Flush the whole table
    pub all: u8,
}

/// Extended bits of a register field.
#[derive(Debug, Clone, Copy)]
pub struct ExtBits {
    /// Register holding the bits
    pub reg: u32,
    /// Field mask within the register
    pub mask: u8,
    /// Field position
    pub shift: u8,
}

/// Dynamic entry aging period.
#[derive(Debug, Clone, Copy)]
pub struct AgingControl {
    /// Seconds per hardware tick
    pub tick_secs: u32,
    /// Low byte of the period, in ticks
    pub period: u32,
    /// Higher period bits, when the field is wider than 8 bits
    pub ext: Option<ExtBits>,
}

impl AgingControl {
    /// Largest representable period in ticks.
    pub const fn max_ticks(&self) -> u32 {
        match self.ext {
            Some(ext) => 0xff | (((ext.mask >> ext.shift) as u32) << 8),
            None => 0xff,
        }
    }
}

/// Tail tag layout.
#[derive(Debug)]
pub struct TailTagLayout {
    /// Tag appended to frames sent to each port, indexed by port number.
    /// Index 0 and ports without an entry hold 0.
    pub ingress: &'static [u16],
    /// Length of the tag appended towards the switch (1 or 2 bytes)
    pub ingress_len: usize,
    /// Length of the tag the switch appends (1 or 2 bytes)
    pub egress_len: usize,
    /// Source port field position in the egress tag
    pub src_shift: u8,
    /// Source port field mask, after shifting
    pub src_mask: u16,
    /// Port number of source field value 0
    pub src_base: u8,
}

/// Register map of one switch chip.
#[derive(Debug)]
pub struct ChipInfo {
    /// Part name
    pub name: &'static str,
    /// 16-bit chip ID register
    pub id_reg: u32,
    /// Expected chip ID
    pub id: u16,
    /// Number of ports, host port included
    pub ports: u8,
    /// Port facing the host MAC
    pub host_port: u8,
    /// Ports with an embedded PHY, bit `n - 1` for port `n`
    pub phy_ports: u32,
    /// Distance between per-port register blocks
    pub port_stride: u32,
    /// SPI command layout
    pub spi: SpiFormat,
    /// Embedded PHY access
    pub phy: PhyAccess,
    /// Line port speed/duplex
    pub speed: SpeedSource,
    /// Port control 0 (tail tag enable), in the port block
    pub port_ctrl0: u32,
    /// MSTP state register, in the port block
    pub mstp_state: u32,
    /// Static address table
    pub static_table: TableControl,
    /// Dynamic (ALU) address table
    pub dynamic_table: TableControl,
    /// Reserved multicast table
    pub reserved_mcast: TableControl,
    /// VLAN table
    pub vlan_table: TableControl,
    /// Dynamic table flush
    pub flush: FlushControl,
    /// Aging period
    pub aging: AgingControl,
    /// Lookup engine control 0 (VLAN enable, reserved multicast lookup)
    pub lue_ctrl0: u32,
    /// Global port mirroring and snooping control
    pub snoop_ctrl: u32,
    /// Unknown multicast control (32-bit)
    pub unknown_mcast_ctrl: u32,
    /// Tail tag layout
    pub tail_tag: TailTagLayout,
}

impl ChipInfo {
    /// Bits of all ports of this chip.
    pub const fn all_ports(&self) -> u32 {
        (1 << self.ports) - 1
    }

    /// Whether `port` exists on this chip.
    pub const fn is_valid_port(&self, port: u8) -> bool {
        port >= 1 && port <= self.ports
    }

    /// Whether `port` has an embedded PHY.
    pub const fn has_phy(&self, port: u8) -> bool {
        self.is_valid_port(port) && self.phy_ports & (1 << (port - 1)) != 0
    }
}

const KSZ9_SPI: SpiFormat = SpiFormat {
    read: 0b011,
    write: 0b010,
    opcode_shift: 29,
    addr_shift: 5,
    addr_mask: 0x00ff_ffff,
    len: 4,
};

const KSZ9_STATIC_TABLE: TableControl = TableControl {
    ctrl: 0x041c,
    ctrl_width: Width::U32,
    index_reg: None,
    index_shift: 16,
    index_mask: 0x0f,
    select: 0,
    read: 1 << 0,
    write: 0,
    search: 0,
    start: 1 << 7,
    valid: 0,
    data: 0x0420,
    words: 4,
    capacity: 16,
};

const KSZ9_RESERVED_MCAST: TableControl = TableControl {
    index_mask: 0x3f,
    select: 1 << 1,
    capacity: 48,
    ..KSZ9_STATIC_TABLE
};

const KSZ9_DYNAMIC_TABLE: TableControl = TableControl {
    ctrl: 0x0418,
    ctrl_width: Width::U32,
    index_reg: None,
    index_shift: 16,
    index_mask: 0x0fff,
    select: 0,
    read: 2,
    write: 1,
    search: 3,
    start: 1 << 7,
    valid: 1 << 6,
    data: 0x0420,
    words: 4,
    capacity: 4096,
};

const KSZ9_VLAN_TABLE: TableControl = TableControl {
    ctrl: 0x040e,
    ctrl_width: Width::U8,
    index_reg: Some(0x040c),
    index_shift: 0,
    index_mask: 0x0fff,
    select: 0,
    read: 2,
    write: 1,
    search: 0,
    start: 1 << 7,
    valid: 0,
    data: 0x0400,
    words: 3,
    capacity: 4096,
};

const KSZ9_FLUSH: FlushControl = FlushControl {
    option_reg: 0x0312,
    option_mask: 0x0c,
    option_dynamic: 0x04,
    ctrl_reg: 0x0311,
    learn_disabled: 1 << 4,
    all: 1 << 5,
};

const KSZ9_PHY_SPEED: SpeedSource = SpeedSource::Phy {
    reg: C22::PHY_CTRL,
    gbit: 1 << 6,
    fast: 1 << 5,
    full_duplex: 1 << 3,
};

/// KSZ9477 7-port gigabit switch, host on port 7.
pub const KSZ9477: ChipInfo = ChipInfo {
    name: "KSZ9477",
    id_reg: 0x0001,
    id: 0x9477,
    ports: 7,
    host_port: 7,
    phy_ports: 0x1f,
    port_stride: 0x1000,
    spi: KSZ9_SPI,
    phy: PhyAccess::Mapped { base: 0x0100 },
    speed: KSZ9_PHY_SPEED,
    port_ctrl0: 0x0020,
    mstp_state: 0x0b04,
    static_table: KSZ9_STATIC_TABLE,
    dynamic_table: KSZ9_DYNAMIC_TABLE,
    reserved_mcast: KSZ9_RESERVED_MCAST,
    vlan_table: KSZ9_VLAN_TABLE,
    flush: KSZ9_FLUSH,
    aging: AgingControl {
        tick_secs: 4,
        period: 0x0313,
        ext: None,
    },
    lue_ctrl0: 0x0310,
    snoop_ctrl: 0x0370,
    unknown_mcast_ctrl: 0x0324,
    tail_tag: TailTagLayout {
        ingress: &[0, 0x0201, 0x0202, 0x0204, 0x0208, 0x0210, 0x0220, 0x0240],
        ingress_len: 2,
        egress_len: 1,
        src_shift: 0,
        src_mask: 0x07,
        src_base: 1,
    },
};

/// KSZ9897, register compatible with the KSZ9477.
pub const KSZ9897: ChipInfo = ChipInfo {
    name: "KSZ9897",
    id: 0x9897,
    ..KSZ9477
};

/// KSZ9893 3-port gigabit switch, host on port 3.
pub const KSZ9893: ChipInfo = ChipInfo {
    name: "KSZ9893",
    id_reg: 0x0001,
    id: 0x9893,
    ports: 3,
    host_port: 3,
    phy_ports: 0x03,
    port_stride: 0x1000,
    spi: KSZ9_SPI,
    phy: PhyAccess::Mapped { base: 0x0100 },
    speed: KSZ9_PHY_SPEED,
    port_ctrl0: 0x0020,
    mstp_state: 0x0b04,
    static_table: KSZ9_STATIC_TABLE,
    dynamic_table: KSZ9_DYNAMIC_TABLE,
    reserved_mcast: KSZ9_RESERVED_MCAST,
    vlan_table: KSZ9_VLAN_TABLE,
    flush: KSZ9_FLUSH,
    aging: AgingControl {
        tick_secs: 4,
        period: 0x0313,
        ext: None,
    },
    lue_ctrl0: 0x0310,
    snoop_ctrl: 0x0370,
    unknown_mcast_ctrl: 0x0324,
    // 0x20: port blocking override
    tail_tag: TailTagLayout {
        ingress: &[0, 0x21, 0x22, 0x24],
        ingress_len: 1,
        egress_len: 1,
        src_shift: 0,
        src_mask: 0x03,
        src_base: 1,
    },
};

/// LAN9370 5-port 100BASE-T1 switch, host on port 5.
pub const LAN9370: ChipInfo = ChipInfo {
    name: "LAN9370",
    id_reg: 0x0001,
    id: 0x9370,
    ports: 5,
    host_port: 5,
    phy_ports: 0x0f,
    port_stride: 0x1000,
    spi: KSZ9_SPI,
    phy: PhyAccess::Indirect {
        addr: 0x075c,
        data: 0x0760,
        ctrl: 0x0768,
        busy: 1 << 0,
        write: 1 << 1,
        base: 0x0100,
    },
    speed: SpeedSource::Fixed {
        speed: Speed::_100,
        duplex: DuplexMode::Full,
    },
    port_ctrl0: 0x0020,
    mstp_state: 0x0b04,
    static_table: KSZ9_STATIC_TABLE,
    dynamic_table: KSZ9_DYNAMIC_TABLE,
    reserved_mcast: KSZ9_RESERVED_MCAST,
    vlan_table: KSZ9_VLAN_TABLE,
    flush: KSZ9_FLUSH,
    aging: AgingControl {
        tick_secs: 4,
        period: 0x0313,
        ext: Some(ExtBits {
            reg: 0x0310,
            mask: 0x38,
            shift: 3,
        }),
    },
    lue_ctrl0: 0x0310,
    snoop_ctrl: 0x0370,
    unknown_mcast_ctrl: 0x0324,
    // 0x2000: valid, 0x0800: port blocking override
    tail_tag: TailTagLayout {
        ingress: &[0, 0x2801, 0x2802, 0x2804, 0x2808, 0x2810],
        ingress_len: 2,
        egress_len: 1,
        src_shift: 0,
        src_mask: 0x07,
        src_base: 1,
    },
};
