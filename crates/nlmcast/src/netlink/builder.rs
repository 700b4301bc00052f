//! Request construction.
//!
//! Requests to the controller are a netlink header, a generic netlink
//! header and a handful of attributes. The builder keeps everything in one
//! growing buffer and patches lengths in place.

use std::mem::offset_of;

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_F_NESTED, NlAttr, nla_align};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Open nested attribute, closed by [`MessageBuilder::nest_end`].
#[derive(Debug, Clone, Copy)]
#[must_use = "a nested attribute must be closed with nest_end"]
pub struct NestToken {
    offset: usize,
}

/// Builder for one netlink message.
///
/// Used for outgoing requests, and by tests to forge kernel replies.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(msg_type: u16, flags: u16) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(NlMsgHdr::new(msg_type, flags).as_bytes());
        buf.resize(NLMSG_HDRLEN, 0);
        Self { buf }
    }

    /// Overwrite a `u32` header field in place.
    fn patch_header(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    /// Append raw bytes, padded to the message alignment.
    pub fn append_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.buf.resize(nlmsg_align(self.buf.len()), 0);
    }

    /// Append a fixed-size header such as `GenlMsgHdr`.
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) {
        self.append_bytes(data.as_bytes());
    }

    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) {
        self.buf
            .extend_from_slice(NlAttr::new(attr_type, data.len()).as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.resize(nla_align(self.buf.len()), 0);
    }

    pub fn append_attr_u16(&mut self, attr_type: u16, value: u16) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a NUL-terminated string attribute.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        self.append_attr(attr_type, &data);
    }

    /// Open a nested attribute. Attributes appended until the matching
    /// [`nest_end`](Self::nest_end) become its children.
    pub fn nest_start(&mut self, attr_type: u16) -> NestToken {
        let offset = self.buf.len();
        self.buf
            .extend_from_slice(NlAttr::new(attr_type | NLA_F_NESTED, 0).as_bytes());
        NestToken { offset }
    }

    pub fn nest_end(&mut self, token: NestToken) {
        let len = (self.buf.len() - token.offset) as u16;
        self.buf[token.offset..token.offset + 2].copy_from_slice(&len.to_ne_bytes());
        self.buf.resize(nla_align(self.buf.len()), 0);
    }

    pub fn set_seq(&mut self, seq: u32) {
        self.patch_header(offset_of!(NlMsgHdr, nlmsg_seq), seq);
    }

    pub fn set_pid(&mut self, pid: u32) {
        self.patch_header(offset_of!(NlMsgHdr, nlmsg_pid), pid);
    }

    /// Bytes appended after the netlink header so far.
    pub fn payload(&self) -> &[u8] {
        &self.buf[NLMSG_HDRLEN..]
    }

    /// Patch the total length into the header and return the message.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.patch_header(offset_of!(NlMsgHdr, nlmsg_len), len);
        self.buf
    }
}
