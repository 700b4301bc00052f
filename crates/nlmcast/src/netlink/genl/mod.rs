//! Generic Netlink (GENL) controller access.
//!
//! Generic Netlink extends the standard netlink protocol with:
//! - Dynamic family ID allocation (resolved via the control family)
//! - Family-specific commands and attributes
//! - Multicast group support per family
//!
//! Everything in this module talks to the control family ("nlctrl").
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐ ┌──────────────────────────┐
//! │ list_families            │ │ resolve_groups           │
//! │ (GETFAMILY dump)         │ │ (GETFAMILY by name)      │
//! └────────────┬─────────────┘ └────────────┬─────────────┘
//!              │                            │
//! ┌────────────▼────────────────────────────▼─────────────┐
//! │ GenlSession<T: Transport>                             │
//! │ (controller id, request/receive sequencing)           │
//! └────────────────────────────┬──────────────────────────┘
//!                              │
//! ┌────────────────────────────▼──────────────────────────┐
//! │ NetlinkSocket (NETLINK_GENERIC)                       │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use nlmcast::netlink::genl::{GenlSession, list_families, resolve_groups};
//!
//! # async fn example() -> nlmcast::Result<()> {
//! let mut session = GenlSession::open()?;
//! session.resolve_controller("nlctrl").await?;
//!
//! for family in list_families(&session).await? {
//!     let groups = resolve_groups(&session, &family.name).await?;
//!     println!("{}: {} groups", family.name, groups.len());
//! }
//! # Ok(())
//! # }
//! ```

mod family;
mod header;
mod mcast;
mod session;

pub use family::{FamilyRecord, decode_family, list_families};
pub use header::{GENL_HDRLEN, GenlMsgHdr};
pub use mcast::{McastGroup, decode_mcast_groups, resolve_groups};
pub use session::{DEFAULT_TIMEOUT, GenlMessage, GenlSession};

/// Control family ID (fixed, not dynamically assigned).
pub const GENL_ID_CTRL: u16 = 0x10;

/// Name of the control family.
pub const GENL_CTRL_NAME: &str = "nlctrl";

/// Control family protocol version sent in requests.
pub const GENL_CTRL_VERSION: u8 = 2;

/// Size of the kernel's family and group name buffers, NUL included.
pub const GENL_NAMSIZ: usize = 16;

/// Control family commands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCmd {
    Unspec = 0,
    NewFamily = 1,
    DelFamily = 2,
    GetFamily = 3,
    NewOps = 4,
    DelOps = 5,
    GetOps = 6,
    NewMcastGrp = 7,
    DelMcastGrp = 8,
    GetMcastGrp = 9,
    GetPolicy = 10,
}

/// Control family attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttr {
    Unspec = 0,
    FamilyId = 1,
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
    Ops = 6,
    McastGroups = 7,
    Policy = 8,
    OpPolicy = 9,
    Op = 10,
}

impl CtrlAttr {
    /// Highest control attribute (`CTRL_ATTR_MAX`).
    pub const MAX: u16 = CtrlAttr::Op as u16;
}

/// Control family multicast group attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrMcastGrp {
    Unspec = 0,
    Name = 1,
    Id = 2,
}

impl CtrlAttrMcastGrp {
    /// Highest multicast group attribute (`CTRL_ATTR_MCAST_GRP_MAX`).
    pub const MAX: u16 = CtrlAttrMcastGrp::Id as u16;
}
