//! Netlink attribute (nlattr) handling.
//!
//! Attributes are TLV records aligned to 4 bytes:
//!
//! ```text
//! ┌──────────┬──────────┬───────────────────────┬─────────┐
//! │ nla_len  │ nla_type │ payload               │ padding │
//! │ (u16)    │ (u16)    │ (nla_len - 4 bytes)   │         │
//! └──────────┴──────────┴───────────────────────┴─────────┘
//! ```
//!
//! [`AttrIter`] walks a flat run of attributes. [`AttrTable`] indexes one
//! level of attributes by type, the way the kernel's `nla_parse()` does.
//! Both borrow the source buffer; nothing is copied.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Netlink attribute header (mirrors struct nlattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Iterator over netlink attributes in a buffer.
///
/// Iteration stops at the first header that is truncated or whose length
/// runs past the buffer; whatever came before it is still yielded.
#[derive(Debug, Clone)]
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = NlAttr::from_bytes(self.data).ok()?;

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            self.data = &[];
            return None;
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // Move to next attribute
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((attr.kind(), payload))
    }
}

/// One level of attributes indexed by type.
///
/// Built with [`AttrTable::parse`]. Types above the declared maximum are
/// dropped, type 0 (`*_UNSPEC`) is never stored, and a repeated type keeps
/// its last occurrence. A missing attribute is simply `None`: callers decide
/// whether that is fatal.
#[derive(Debug, Clone)]
pub struct AttrTable<'a> {
    slots: Vec<Option<&'a [u8]>>,
}

impl<'a> AttrTable<'a> {
    /// Index the attributes in `data`, keeping types `1..=max_attr`.
    pub fn parse(data: &'a [u8], max_attr: u16) -> Self {
        let mut slots = vec![None; usize::from(max_attr) + 1];
        for (kind, payload) in AttrIter::new(data) {
            if kind == 0 || kind > max_attr {
                continue;
            }
            slots[usize::from(kind)] = Some(payload);
        }
        Self { slots }
    }

    /// The highest attribute type this table accepts.
    pub fn max_attr(&self) -> u16 {
        (self.slots.len() - 1) as u16
    }

    /// Payload of attribute `kind`, if present.
    pub fn get(&self, kind: u16) -> Option<&'a [u8]> {
        self.slots.get(usize::from(kind)).copied().flatten()
    }

    /// Check whether attribute `kind` is present.
    pub fn contains(&self, kind: u16) -> bool {
        self.get(kind).is_some()
    }

    /// Iterate the entries of a nested (array-of-attributes) attribute.
    ///
    /// An absent attribute yields an empty iterator.
    pub fn nested(&self, kind: u16) -> AttrIter<'a> {
        AttrIter::new(self.get(kind).unwrap_or(&[]))
    }

    /// Number of distinct attributes present.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if no attribute in range was present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Helper functions for extracting typed values from attribute payloads.
///
/// Generic netlink carries integers in host byte order unless the
/// attribute is flagged with [`NLA_F_NET_BYTEORDER`].
pub mod get {
    use super::*;

    /// Extract a u8 value.
    pub fn u8(data: &[u8]) -> Result<u8> {
        if data.is_empty() {
            return Err(Error::InvalidAttribute("empty u8 attribute".into()));
        }
        Ok(data[0])
    }

    /// Extract a u16 value (native endian).
    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        if data.len() < 2 {
            return Err(Error::InvalidAttribute("truncated u16 attribute".into()));
        }
        Ok(u16::from_ne_bytes([data[0], data[1]]))
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        if data.len() < 4 {
            return Err(Error::InvalidAttribute("truncated u32 attribute".into()));
        }
        Ok(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Extract a u64 value (native endian).
    pub fn u64_ne(data: &[u8]) -> Result<u64> {
        if data.len() < 8 {
            return Err(Error::InvalidAttribute("truncated u64 attribute".into()));
        }
        Ok(u64::from_ne_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]))
    }

    /// Extract an unsigned integer whose width is given by the payload
    /// length (1, 2, 4 or 8 bytes, native endian).
    pub fn uint_ne(data: &[u8]) -> Result<u64> {
        match data.len() {
            1 => Ok(u64::from(data[0])),
            2 => u16_ne(data).map(u64::from),
            4 => u32_ne(data).map(u64::from),
            8 => u64_ne(data),
            n => Err(Error::InvalidAttribute(format!(
                "unexpected integer attribute width: {} bytes",
                n
            ))),
        }
    }

    /// Extract a null-terminated string.
    ///
    /// Reads up to the first NUL or the end of the payload, so an
    /// unterminated value never reads past the attribute.
    pub fn string(data: &[u8]) -> Result<&str> {
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len])
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }

    /// Extract a null-terminated string that must fit in a `max`-byte
    /// kernel buffer (terminator included), e.g. `GENL_NAMSIZ`.
    pub fn bounded_string(data: &[u8], max: usize) -> Result<&str> {
        let s = string(data)?;
        if s.len() >= max {
            return Err(Error::InvalidAttribute(format!(
                "string of {} bytes exceeds limit of {}",
                s.len(),
                max - 1
            )));
        }
        Ok(s)
    }

    /// Extract an i32 value (native endian).
    pub fn i32_ne(data: &[u8]) -> Result<i32> {
        if data.len() < 4 {
            return Err(Error::InvalidAttribute("truncated i32 attribute".into()));
        }
        Ok(i32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
    }
}
