//! Multicast group lookup for a single family.

use serde::Serialize;

use super::session::GenlSession;
use super::{CtrlAttr, CtrlAttrMcastGrp, CtrlCmd, GENL_NAMSIZ};
use crate::netlink::attr::{AttrTable, get};
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{NLM_F_ACK, NLM_F_REQUEST};
use crate::netlink::transport::Transport;

/// A multicast group exposed by a family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct McastGroup {
    /// Group ID, the value to pass to `NETLINK_ADD_MEMBERSHIP`.
    pub id: u32,
    /// Group name, unique within its family.
    pub name: String,
}

/// Decode `CTRL_ATTR_MCAST_GROUPS` from the attributes of a GETFAMILY reply.
///
/// No groups attribute means no groups. An entry lacking its name or ID,
/// or whose values don't decode, is dropped and the remaining entries are
/// still returned. Groups keep the order the kernel listed them in; a
/// repeated name or ID keeps the first occurrence.
pub fn decode_mcast_groups(attrs: &[u8]) -> Vec<McastGroup> {
    let table = AttrTable::parse(attrs, CtrlAttr::MAX);
    let mut groups: Vec<McastGroup> = Vec::new();

    for (index, (_, entry)) in table.nested(CtrlAttr::McastGroups as u16).enumerate() {
        let grp = AttrTable::parse(entry, CtrlAttrMcastGrp::MAX);

        let (Some(name), Some(id)) = (
            grp.get(CtrlAttrMcastGrp::Name as u16),
            grp.get(CtrlAttrMcastGrp::Id as u16),
        ) else {
            tracing::debug!(index, "skipping multicast group without name or ID");
            continue;
        };

        let name = match get::bounded_string(name, GENL_NAMSIZ) {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => {
                tracing::debug!(index, "skipping multicast group with empty name");
                continue;
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping multicast group");
                continue;
            }
        };

        let id = match get::u32_ne(id) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(index, name, error = %e, "skipping multicast group");
                continue;
            }
        };

        if groups.iter().any(|g| g.name == name || g.id == id) {
            tracing::warn!(name, id, "skipping duplicate multicast group");
            continue;
        }

        groups.push(McastGroup {
            id,
            name: name.to_string(),
        });
    }

    groups
}

/// Query the multicast groups of one family by name.
///
/// A family that registered no groups yields an empty list. A family the
/// kernel doesn't know yields [`Error::FamilyNotFound`].
pub async fn resolve_groups<T: Transport>(
    session: &GenlSession<T>,
    family_name: &str,
) -> Result<Vec<McastGroup>> {
    let seq = session
        .request(
            session.controller_id(),
            CtrlCmd::GetFamily as u8,
            NLM_F_REQUEST | NLM_F_ACK,
            |b| b.append_attr_str(CtrlAttr::FamilyName as u16, family_name),
        )
        .await?;

    let operation = format!("querying family {}", family_name);
    let mut groups = None;
    let result = session
        .receive(seq, &operation, |msg| {
            if groups.is_some() {
                tracing::debug!(family = family_name, "ignoring extra GETFAMILY reply");
                return Ok(());
            }
            groups = Some(decode_mcast_groups(msg.attrs));
            Ok(())
        })
        .await;

    match result {
        Ok(()) => {
            let groups = groups.unwrap_or_default();
            tracing::debug!(family = family_name, count = groups.len(), "resolved groups");
            Ok(groups)
        }
        Err(e) if e.errno() == Some(libc::ENOENT) => Err(Error::FamilyNotFound {
            name: family_name.to_string(),
        }),
        Err(e) => Err(e.with_context(operation)),
    }
}
