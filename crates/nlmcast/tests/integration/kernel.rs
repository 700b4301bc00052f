//! Catalog discovery against the running kernel.
//!
//! Needs a kernel with generic netlink, which is every Linux kernel since
//! 2.6.15. No privileges are required to read the controller.

use nlmcast::netlink::genl::{GENL_ID_CTRL, GenlSession, resolve_groups};
use nlmcast::{DiscoveryConfig, FailurePolicy, build_catalog, build_catalog_with};

#[tokio::test]
async fn test_kernel_catalog_has_controller() {
    let catalog = build_catalog().await.unwrap();

    let ctrl = catalog.family("nlctrl").expect("nlctrl is always registered");
    assert_eq!(ctrl.id, GENL_ID_CTRL);
    assert!(ctrl.group("notify").is_some());
}

#[tokio::test]
async fn test_kernel_catalog_names_unique() {
    let config = DiscoveryConfig::new().policy(FailurePolicy::SkipFamily);
    let catalog = build_catalog_with(&config).await.unwrap();

    let mut names: Vec<&str> = catalog.iter().map(|f| f.name.as_str()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[tokio::test]
async fn test_kernel_unknown_family() {
    let mut session = GenlSession::open().unwrap();
    session.resolve_controller("nlctrl").await.unwrap();

    let err = resolve_groups(&session, "no_such_family")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
