//! The family → multicast group catalog.
//!
//! Discovery runs in two phases over one session: a GETFAMILY dump lists
//! every family, then one GETFAMILY request per family (in dump order)
//! fetches its multicast groups. Nothing is requested concurrently.

use std::time::Duration;

use serde::Serialize;

use crate::netlink::genl::{
    DEFAULT_TIMEOUT, FamilyRecord, GENL_CTRL_NAME, GenlSession, list_families, resolve_groups,
};
use crate::netlink::{Result, Transport};

/// What to do when one family's group query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole build.
    #[default]
    Abort,
    /// Leave the family out of the catalog and continue. Transport
    /// failures (send, receive, timeout) still fail the build.
    SkipFamily,
}

/// Settings for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Name of the controller family to resolve first.
    pub controller: String,
    /// Per-reply timeout; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Policy for per-family query failures.
    pub policy: FailurePolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            controller: GENL_CTRL_NAME.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            policy: FailurePolicy::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the controller family name.
    pub fn controller(mut self, name: impl Into<String>) -> Self {
        self.controller = name.into();
        self
    }

    /// Set the per-reply timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the failure policy.
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Every Generic Netlink family and its multicast groups.
///
/// Families are in dump order, which the kernel does not define; look
/// families up by name rather than by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    families: Vec<FamilyRecord>,
}

impl Catalog {
    /// Run discovery over an open session.
    ///
    /// Resolves the controller, lists the families, then queries each
    /// family's groups in turn.
    pub async fn discover<T: Transport>(
        session: &mut GenlSession<T>,
        config: &DiscoveryConfig,
    ) -> Result<Self> {
        session.set_timeout(config.timeout);
        session.resolve_controller(&config.controller).await?;

        let listed = list_families(session).await?;
        tracing::debug!(count = listed.len(), "listed families");

        let mut families = Vec::with_capacity(listed.len());
        for mut family in listed {
            match resolve_groups(session, &family.name).await {
                Ok(groups) => {
                    family.mcast_groups = groups;
                    families.push(family);
                }
                Err(e) if config.policy == FailurePolicy::SkipFamily && !e.is_transport() => {
                    tracing::warn!(
                        family = %family.name,
                        error = %e,
                        "skipping family whose groups could not be read"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self { families })
    }

    #[cfg(test)]
    pub(crate) fn from_families(families: Vec<FamilyRecord>) -> Self {
        Self { families }
    }

    /// All families.
    pub fn families(&self) -> &[FamilyRecord] {
        &self.families
    }

    /// Iterate over the families.
    pub fn iter(&self) -> std::slice::Iter<'_, FamilyRecord> {
        self.families.iter()
    }

    /// Number of families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Check if no family was found.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Look up a family by name.
    pub fn family(&self, name: &str) -> Option<&FamilyRecord> {
        self.families.iter().find(|f| f.name == name)
    }

    /// The ID to join for `group` of `family`, if both exist.
    pub fn group_id(&self, family: &str, group: &str) -> Option<u32> {
        self.family(family)?.group(group).map(|g| g.id)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a FamilyRecord;
    type IntoIter = std::slice::Iter<'a, FamilyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.families.iter()
    }
}

/// Discover the catalog with default settings.
pub async fn build_catalog() -> Result<Catalog> {
    build_catalog_with(&DiscoveryConfig::default()).await
}

/// Open a socket, discover the catalog, and release the socket.
///
/// The socket is closed whether discovery succeeds or not.
pub async fn build_catalog_with(config: &DiscoveryConfig) -> Result<Catalog> {
    let mut session = GenlSession::open()?;
    let result = Catalog::discover(&mut session, config).await;
    session.close();

    if let Ok(catalog) = &result {
        tracing::debug!(families = catalog.len(), "catalog built");
    }
    result
}
