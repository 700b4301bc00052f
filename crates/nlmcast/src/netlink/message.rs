//! Netlink message framing.
//!
//! A receive buffer holds one or more messages, each a 16-byte `nlmsghdr`
//! followed by its payload and padded to a 4-byte boundary.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

const NLMSG_ALIGNTO: usize = 4;

/// Round `len` up to the netlink message alignment.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (`struct nlmsghdr`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type; the family ID for generic netlink data messages.
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
    pub nlmsg_seq: u32,
    /// Port ID of the sender, 0 for the kernel.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Header for an empty message of `msg_type`.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.nlmsg_type == NlMsgType::ERROR
    }

    pub fn is_done(&self) -> bool {
        self.nlmsg_type == NlMsgType::DONE
    }

    pub fn is_noop(&self) -> bool {
        self.nlmsg_type == NlMsgType::NOOP
    }

    /// Check if the kernel dropped messages for this socket.
    pub fn is_overrun(&self) -> bool {
        self.nlmsg_type == NlMsgType::OVERRUN
    }

    /// Check if this message is part of a multipart reply.
    pub fn is_multi(&self) -> bool {
        self.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// Check if the table being dumped changed while the dump ran.
    pub fn is_dump_interrupted(&self) -> bool {
        self.nlmsg_flags & NLM_F_DUMP_INTR != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Borrow the header at the start of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Control message types shared by all netlink protocols.
pub struct NlMsgType;

impl NlMsgType {
    /// No operation, message must be discarded.
    pub const NOOP: u16 = 1;
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;
    /// Data lost, request resend.
    pub const OVERRUN: u16 = 4;
}

pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_DUMP_INTR: u16 = 0x10;

// GET request modifiers
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

/// Iterator over the messages of one receive buffer.
///
/// Yields `(header, payload)` pairs. A malformed header ends the
/// iteration after its error is yielded, since the next message boundary
/// can't be trusted.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn fail(&mut self, err: Error) -> Option<Result<(&'a NlMsgHdr, &'a [u8])>> {
        self.data = &[];
        Some(Err(err))
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(&'a NlMsgHdr, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLMSG_HDRLEN {
            return None;
        }

        let header = match NlMsgHdr::from_bytes(self.data) {
            Ok(h) => h,
            Err(e) => return self.fail(e),
        };

        let msg_len = header.nlmsg_len as usize;
        if msg_len < NLMSG_HDRLEN || msg_len > self.data.len() {
            return self.fail(Error::InvalidMessage(format!(
                "message length {} does not fit buffer of {} bytes",
                msg_len,
                self.data.len()
            )));
        }

        let payload = &self.data[NLMSG_HDRLEN..msg_len];
        let next = nlmsg_align(msg_len).min(self.data.len());
        self.data = &self.data[next..];

        Some(Ok((header, payload)))
    }
}

/// Payload of an `NLMSG_ERROR` message (`struct nlmsgerr`).
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Negative errno, or 0 for an ACK.
    pub error: i32,
    /// Header of the request being answered.
    pub msg: NlMsgHdr,
}

impl NlMsgError {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }
}
