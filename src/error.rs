//! Driver errors.

/// Error returned by switch operations.
///
/// `E` is the error type of the underlying [`RegisterTransport`](crate::RegisterTransport).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The control bus reported an error.
    Bus(E),
    /// No free slot left in the static address table.
    TableFull,
    /// No table entry matches the requested address.
    NotFound,
    /// The addressed table slot does not hold a valid entry.
    InvalidEntry,
    /// Index past the last entry of the table, or the dynamic table search ended.
    EndOfTable,
    /// Port number out of range for this chip.
    InvalidPort,
    /// Frame too short to carry a tail tag, or buffer too small to append one.
    InvalidLength,
    /// The chip ID register does not match the selected [`ChipInfo`](crate::chip::ChipInfo).
    WrongIdentifier,
    /// A self-clearing busy/start bit did not clear within `Config::poll_limit` reads.
    Timeout,
    /// The transport cannot reach the switch register space (MDIO-only access).
    Unsupported,
    /// A dynamic table read at a nonzero index without a search started at index 0.
    CursorNotStarted,
    /// Argument outside the range the hardware can represent.
    InvalidParameter,
}

impl<E> From<TagError> for Error<E> {
    fn from(err: TagError) -> Self {
        match err {
            TagError::InvalidPort => Error::InvalidPort,
            TagError::InvalidLength => Error::InvalidLength,
        }
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::TableFull => f.write_str("address table full"),
            Error::NotFound => f.write_str("entry not found"),
            Error::InvalidEntry => f.write_str("invalid table entry"),
            Error::EndOfTable => f.write_str("end of table"),
            Error::InvalidPort => f.write_str("invalid port"),
            Error::InvalidLength => f.write_str("invalid frame length"),
            Error::WrongIdentifier => f.write_str("unexpected chip identifier"),
            Error::Timeout => f.write_str("timed out waiting for the switch"),
            Error::Unsupported => f.write_str("switch registers not reachable on this bus"),
            Error::CursorNotStarted => f.write_str("dynamic table search not started at index 0"),
            Error::InvalidParameter => f.write_str("invalid parameter"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Error<E> {}

/// Error returned by the tail tag codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TagError {
    /// Port number has no tail tag encoding.
    InvalidPort,
    /// Frame or buffer length cannot hold the tag.
    InvalidLength,
}

impl core::fmt::Display for TagError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TagError::InvalidPort => f.write_str("invalid port"),
            TagError::InvalidLength => f.write_str("invalid frame length"),
        }
    }
}

impl core::error::Error for TagError {}
