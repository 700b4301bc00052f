//! Async generic netlink controller protocol for Linux.
//!
//! This module implements just enough of netlink to talk to the generic
//! netlink controller ("nlctrl"): message and attribute codecs, an async
//! `NETLINK_GENERIC` socket, and the GETFAMILY exchanges in [`genl`].
//!
//! # Quick Start
//!
//! ```ignore
//! use nlmcast::netlink::genl::{GenlSession, resolve_groups};
//!
//! let mut session = GenlSession::open()?;
//! session.resolve_controller("nlctrl").await?;
//!
//! let groups = resolve_groups(&session, "nl80211").await?;
//! for group in &groups {
//!     println!("{} = {}", group.name, group.id);
//! }
//! ```

pub mod attr;
mod builder;
mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod genl;
pub mod message;
mod socket;
mod transport;

pub use attr::{AttrIter, AttrTable, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use error::{Error, Result, Stage};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use socket::NetlinkSocket;
pub use transport::Transport;
