//! Netlink message fixtures for testing.
//!
//! Attribute payloads as the controller sends them (little-endian host),
//! plus helpers to wrap them in netlink/genl headers and a scripted
//! transport that replays canned datagrams.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::genl::{CtrlAttr, CtrlAttrMcastGrp, CtrlCmd, GENL_ID_CTRL, GenlMsgHdr};
use super::message::{NLMSG_HDRLEN, NlMsgType};
use super::transport::Transport;

/// Port ID reported by [`ScriptedTransport`].
pub const TEST_PID: u32 = 4242;

/// CTRL_CMD_GETFAMILY reply attributes for the controller itself.
/// Captured from: genl ctrl get name nlctrl (groups stripped)
pub fn attrs_family_nlctrl() -> Vec<u8> {
    vec![
        // CTRL_ATTR_FAMILY_ID = 0x10
        0x06, 0x00, // len = 6
        0x01, 0x00, // type = CTRL_ATTR_FAMILY_ID (1)
        0x10, 0x00, 0x00, 0x00, // id = 16 + padding
        // CTRL_ATTR_FAMILY_NAME = "nlctrl"
        0x0b, 0x00, // len = 11
        0x02, 0x00, // type = CTRL_ATTR_FAMILY_NAME (2)
        b'n', b'l', b'c', b't', b'r', b'l', 0x00, 0x00, // "nlctrl\0" + padding
        // CTRL_ATTR_VERSION = 2
        0x08, 0x00, // len = 8
        0x03, 0x00, // type = CTRL_ATTR_VERSION (3)
        0x02, 0x00, 0x00, 0x00, // version = 2
    ]
}

/// CTRL_CMD_GETFAMILY reply attributes for nl80211 with two groups.
pub fn attrs_family_nl80211() -> Vec<u8> {
    vec![
        // CTRL_ATTR_FAMILY_ID = 0x21
        0x06, 0x00, // len = 6
        0x01, 0x00, // type = CTRL_ATTR_FAMILY_ID (1)
        0x21, 0x00, 0x00, 0x00, // id = 33 + padding
        // CTRL_ATTR_FAMILY_NAME = "nl80211"
        0x0c, 0x00, // len = 12
        0x02, 0x00, // type = CTRL_ATTR_FAMILY_NAME (2)
        b'n', b'l', b'8', b'0', b'2', b'1', b'1', 0x00, // "nl80211\0"
        // CTRL_ATTR_VERSION = 1
        0x08, 0x00, // len = 8
        0x03, 0x00, // type = CTRL_ATTR_VERSION (3)
        0x01, 0x00, 0x00, 0x00, // version = 1
        // CTRL_ATTR_MCAST_GROUPS
        0x34, 0x00, // len = 52
        0x07, 0x80, // type = CTRL_ATTR_MCAST_GROUPS (7) | NLA_F_NESTED
        // group #1
        0x18, 0x00, // len = 24
        0x01, 0x80, // type = 1 | NLA_F_NESTED
        0x08, 0x00, 0x02, 0x00, // CTRL_ATTR_MCAST_GRP_ID
        0x03, 0x00, 0x00, 0x00, // id = 3
        0x09, 0x00, 0x01, 0x00, // CTRL_ATTR_MCAST_GRP_NAME
        b'm', b'l', b'm', b'e', 0x00, 0x00, 0x00, 0x00, // "mlme\0" + padding
        // group #2
        0x18, 0x00, // len = 24
        0x02, 0x80, // type = 2 | NLA_F_NESTED
        0x08, 0x00, 0x02, 0x00, // CTRL_ATTR_MCAST_GRP_ID
        0x05, 0x00, 0x00, 0x00, // id = 5
        0x09, 0x00, 0x01, 0x00, // CTRL_ATTR_MCAST_GRP_NAME
        b's', b'c', b'a', b'n', 0x00, 0x00, 0x00, 0x00, // "scan\0" + padding
    ]
}

/// Build family reply attributes. Each group is `(name, id)`; `None`
/// leaves that sub-attribute out.
pub fn family_attrs(
    id: Option<u16>,
    name: Option<&str>,
    version: u32,
    groups: &[(Option<&str>, Option<u32>)],
) -> Vec<u8> {
    let mut b = MessageBuilder::new(0, 0);
    if let Some(id) = id {
        b.append_attr_u16(CtrlAttr::FamilyId as u16, id);
    }
    if let Some(name) = name {
        b.append_attr_str(CtrlAttr::FamilyName as u16, name);
    }
    b.append_attr_u32(CtrlAttr::Version as u16, version);
    if !groups.is_empty() {
        let outer = b.nest_start(CtrlAttr::McastGroups as u16);
        for (i, (grp_name, grp_id)) in groups.iter().enumerate() {
            let entry = b.nest_start(i as u16 + 1);
            if let Some(grp_id) = grp_id {
                b.append_attr_u32(CtrlAttrMcastGrp::Id as u16, *grp_id);
            }
            if let Some(grp_name) = grp_name {
                b.append_attr_str(CtrlAttrMcastGrp::Name as u16, grp_name);
            }
            b.nest_end(entry);
        }
        b.nest_end(outer);
    }
    b.payload().to_vec()
}

/// Wrap a payload in a netlink header.
pub fn nlmsg(msg_type: u16, flags: u16, seq: u32, payload: &[u8]) -> Vec<u8> {
    let mut b = MessageBuilder::new(msg_type, flags);
    b.append_bytes(payload);
    b.set_seq(seq);
    b.set_pid(TEST_PID);
    b.finish()
}

/// A CTRL_CMD_NEWFAMILY reply carrying `attrs`.
pub fn genl_reply(seq: u32, flags: u16, attrs: &[u8]) -> Vec<u8> {
    let mut payload = GenlMsgHdr::new(CtrlCmd::NewFamily as u8, 2).as_bytes().to_vec();
    payload.extend_from_slice(attrs);
    nlmsg(GENL_ID_CTRL, flags, seq, &payload)
}

/// An NLMSG_ERROR frame; `errno` 0 is an ACK.
pub fn error(seq: u32, errno: i32) -> Vec<u8> {
    let mut payload = errno.to_ne_bytes().to_vec();
    // Echo of the request header (only the length matters to the parser)
    payload.extend_from_slice(&[0u8; NLMSG_HDRLEN]);
    nlmsg(NlMsgType::ERROR, 0, seq, &payload)
}

/// An NLMSG_DONE frame ending a dump.
pub fn done(seq: u32) -> Vec<u8> {
    nlmsg(NlMsgType::DONE, 0, seq, &0i32.to_ne_bytes())
}

/// Transport that replays pre-built datagrams and records requests.
///
/// Once the script is exhausted `recv_msg` fails like a closed socket,
/// unless the transport was created with [`stalled`](Self::stalled).
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    seq: AtomicU32,
    stalled: bool,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Vec<u8>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            sent: Mutex::new(Vec::new()),
            seq: AtomicU32::new(1),
            stalled: false,
        }
    }

    /// A transport whose receive never completes.
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::new(vec![])
        }
    }

    /// Requests sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn pid(&self) -> u32 {
        TEST_PID
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().push(msg.to_vec());
        Ok(())
    }

    async fn recv_msg(&self) -> Result<Vec<u8>> {
        if self.stalled {
            return std::future::pending().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Recv(io::Error::from(io::ErrorKind::ConnectionAborted)))
    }
}
