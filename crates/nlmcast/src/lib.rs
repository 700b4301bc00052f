//! Discover Generic Netlink families and their multicast groups.
//!
//! Multicast group IDs of generic netlink families are assigned when the
//! family registers, so they differ between kernels and even between
//! boots. This crate asks the controller ("nlctrl") for every registered
//! family and for each family's multicast groups, and hands back a
//! [`Catalog`] to look IDs up in.
//!
//! # Example
//!
//! ```ignore
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> nlmcast::Result<()> {
//!     let catalog = nlmcast::build_catalog().await?;
//!
//!     if let Some(id) = catalog.group_id("nl80211", "scan") {
//!         println!("join group {} for scan events", id);
//!     }
//!
//!     for family in &catalog {
//!         println!("{} ({} groups)", family.name, family.mcast_groups.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The protocol layer lives in [`netlink`]; [`netlink::genl`] exposes the
//! individual steps (controller resolution, family dump, group query) for
//! callers that want to drive them directly.

pub mod catalog;
pub mod netlink;
pub mod output;

// Re-export common types at crate root for convenience
pub use catalog::{Catalog, DiscoveryConfig, FailurePolicy, build_catalog, build_catalog_with};
pub use netlink::genl::{FamilyRecord, GenlSession, McastGroup};
pub use netlink::{Error, Result, Stage};
