//! Family enumeration via a CTRL_CMD_GETFAMILY dump.

use serde::Serialize;

use super::mcast::McastGroup;
use super::session::GenlSession;
use super::{CtrlAttr, CtrlCmd, GENL_NAMSIZ};
use crate::netlink::attr::{AttrTable, get};
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{NLM_F_DUMP, NLM_F_REQUEST};
use crate::netlink::transport::Transport;

/// A registered Generic Netlink family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyRecord {
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family name, unique per kernel.
    pub name: String,
    /// Family version.
    pub version: u32,
    /// Multicast groups, in the order the kernel reported them.
    pub mcast_groups: Vec<McastGroup>,
}

impl FamilyRecord {
    /// Look up a multicast group by name.
    pub fn group(&self, name: &str) -> Option<&McastGroup> {
        self.mcast_groups.iter().find(|g| g.name == name)
    }

    /// Check whether the family exposes any multicast group.
    pub fn has_mcast_groups(&self) -> bool {
        !self.mcast_groups.is_empty()
    }
}

/// Decode one family record from the attributes of a GETFAMILY reply.
///
/// The ID and name are required. A missing version reads as 0. Multicast
/// groups are not decoded here; the record comes back with none.
pub fn decode_family(attrs: &[u8]) -> Result<FamilyRecord> {
    let table = AttrTable::parse(attrs, CtrlAttr::MAX);

    let id = table
        .get(CtrlAttr::FamilyId as u16)
        .ok_or_else(|| Error::InvalidMessage("missing family ID".into()))?;
    let id = get::uint_ne(id)?;
    let id = u16::try_from(id)
        .map_err(|_| Error::InvalidAttribute(format!("family ID {} out of range", id)))?;

    let name = table
        .get(CtrlAttr::FamilyName as u16)
        .ok_or_else(|| Error::InvalidMessage(format!("missing name for family {:#x}", id)))?;
    let name = get::bounded_string(name, GENL_NAMSIZ)?;
    if name.is_empty() {
        return Err(Error::InvalidAttribute(format!(
            "empty name for family {:#x}",
            id
        )));
    }

    let version = match table.get(CtrlAttr::Version as u16) {
        Some(v) => get::u32_ne(v)?,
        None => 0,
    };

    Ok(FamilyRecord {
        id,
        name: name.to_string(),
        version,
        mcast_groups: Vec::new(),
    })
}

/// List every family registered with the kernel.
///
/// Sends an unfiltered GETFAMILY dump to the session's controller.
/// Records that fail to decode, and repeats of an already seen name, are
/// skipped with a warning. Families come back in dump order.
pub async fn list_families<T: Transport>(session: &GenlSession<T>) -> Result<Vec<FamilyRecord>> {
    const OPERATION: &str = "listing generic netlink families";

    let seq = session
        .request(
            session.controller_id(),
            CtrlCmd::GetFamily as u8,
            NLM_F_REQUEST | NLM_F_DUMP,
            |_| {},
        )
        .await?;

    let mut families: Vec<FamilyRecord> = Vec::new();
    let mut interrupted = false;
    session
        .receive(seq, OPERATION, |msg| {
            interrupted |= msg.header.is_dump_interrupted();
            match decode_family(msg.attrs) {
                Ok(family) if families.iter().any(|f| f.name == family.name) => {
                    tracing::warn!(name = %family.name, "skipping duplicate family record");
                }
                Ok(family) => {
                    tracing::debug!(id = family.id, name = %family.name, "found family");
                    families.push(family);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed family record");
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| e.with_context(OPERATION))?;

    if interrupted {
        tracing::warn!("family table changed during dump, listing may be incomplete");
    }
    Ok(families)
}
