//! Tail tags multiplex the line ports over the single host link.
//!
//! Frames sent to the switch carry a trailer selecting the egress port.
//! Frames received from the switch carry a trailer naming the port they
//! arrived on. Both sit behind the payload, before the FCS the MAC appends.

use crate::chip::TailTagLayout;
use crate::fmt::Bytes;
use crate::TagError;

/// Shortest Ethernet frame without FCS. Tagged frames are padded to this length first.
pub const MIN_FRAME_LEN: usize = 60;
const ETH_HEADER_LEN: usize = 14;

/// Encoded tail tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TailTag {
    bytes: [u8; 2],
    len: usize,
}

impl TailTag {
    const EMPTY: Self = Self { bytes: [0; 2], len: 0 };

    /// Tag bytes in wire order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Tail tag encoder/decoder for one chip.
#[derive(Debug, Clone, Copy)]
pub struct TailTagCodec {
    layout: Option<&'static TailTagLayout>,
}

impl TailTagCodec {
    /// Codec using `layout`.
    pub const fn new(layout: &'static TailTagLayout) -> Self {
        Self { layout: Some(layout) }
    }

    /// Pass-through codec for switches running without tail tags.
    pub const fn disabled() -> Self {
        Self { layout: None }
    }

    /// Bytes added to an outbound frame, not counting padding.
    pub fn overhead(&self) -> usize {
        self.layout.map_or(0, |l| l.ingress_len)
    }

    /// Tag directing a frame to `port`.
    pub fn encode(&self, port: u8) -> Result<TailTag, TagError> {
        let Some(layout) = self.layout else {
            return Ok(TailTag::EMPTY);
        };
        let tag = match layout.ingress.get(usize::from(port)) {
            Some(&tag) if port != 0 && tag != 0 => tag,
            _ => return Err(TagError::InvalidPort),
        };

        let be = tag.to_be_bytes();
        let bytes = match layout.ingress_len {
            1 => [be[1], 0],
            _ => be,
        };
        Ok(TailTag {
            bytes,
            len: layout.ingress_len,
        })
    }

    /// Pad the `len`-byte frame at the start of `buf` and append the tag for `port`.
    ///
    /// Returns the new frame length.
    pub fn tag_frame(&self, buf: &mut [u8], len: usize, port: u8) -> Result<usize, TagError> {
        let tag = self.encode(port)?;
        if tag.len == 0 {
            return if len <= buf.len() {
                Ok(len)
            } else {
                Err(TagError::InvalidLength)
            };
        }

        let padded = len.max(MIN_FRAME_LEN);
        let total = padded + tag.len;
        if len > buf.len() || total > buf.len() {
            return Err(TagError::InvalidLength);
        }
        buf[len..padded].fill(0);
        buf[padded..total].copy_from_slice(tag.as_bytes());
        trace!("tx port {}: tag {}, {} -> {} bytes", port, Bytes(tag.as_bytes()), len, total);
        Ok(total)
    }

    /// Split the trailer off a frame received from the switch.
    ///
    /// Returns the source port and the frame without the tag. A disabled
    /// codec returns the frame unchanged and no port.
    pub fn decode<'a>(&self, frame: &'a [u8]) -> Result<(Option<u8>, &'a [u8]), TagError> {
        let Some(layout) = self.layout else {
            return Ok((None, frame));
        };
        let n = layout.egress_len;
        if frame.len() < ETH_HEADER_LEN + n {
            return Err(TagError::InvalidLength);
        }

        let (payload, trailer) = frame.split_at(frame.len() - n);
        let tag = trailer.iter().fold(0u16, |acc, &b| (acc << 8) | u16::from(b));
        let port = ((tag >> layout.src_shift) & layout.src_mask) as u8 + layout.src_base;
        Ok((Some(port), payload))
    }
}
