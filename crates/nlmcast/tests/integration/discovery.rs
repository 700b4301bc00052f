//! Catalog discovery against the in-memory controller.

use std::collections::BTreeSet;

use nlmcast::netlink::genl::{GENL_NAMSIZ, list_families, resolve_groups};
use nlmcast::output::{OutputFormat, OutputOptions, PrintableList};
use nlmcast::{Catalog, DiscoveryConfig, Error, FailurePolicy, GenlSession};

use crate::common::{FakeFamily, FakeKernel};

async fn discover(kernel: FakeKernel, config: &DiscoveryConfig) -> nlmcast::Result<Catalog> {
    let mut session = GenlSession::with_transport(kernel);
    let result = Catalog::discover(&mut session, config).await;
    session.close();
    result
}

fn typical_kernel() -> FakeKernel {
    FakeKernel::new(vec![
        FakeFamily::nlctrl(),
        FakeFamily::new(0x15, "acpi_event", 1).group("acpi_mc_group", 2),
        FakeFamily::new(0x17, "tcp_metrics", 1),
        FakeFamily::new(0x1c, "thermal", 1)
            .group("sampling", 4)
            .group("event", 5),
        FakeFamily::new(0x21, "nl80211", 1)
            .group("config", 6)
            .group("scan", 7)
            .group("regulatory", 8)
            .group("mlme", 9)
            .group("vendor", 10)
            .group("nan", 11),
    ])
}

#[tokio::test]
async fn test_scenario_controller_only() {
    let kernel = FakeKernel::new(vec![FakeFamily::new(0x10, "nlctrl", 2)]);
    let catalog = discover(kernel, &DiscoveryConfig::default()).await.unwrap();

    assert_eq!(catalog.len(), 1);
    let family = &catalog.families()[0];
    assert_eq!(family.id, 0x10);
    assert_eq!(family.name, "nlctrl");
    assert_eq!(family.version, 2);
    assert!(family.mcast_groups.is_empty());

    let mut out = Vec::new();
    catalog
        .print(&mut out, OutputFormat::Text, &OutputOptions::default())
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Family: nlctrl, ID: 16, Version: 2"));
    assert!(text.contains("No multicast groups"));
}

#[tokio::test]
async fn test_scenario_nl80211_groups() {
    let kernel = FakeKernel::new(vec![
        FakeFamily::nlctrl(),
        FakeFamily::new(0x21, "nl80211", 1)
            .group("mlme", 3)
            .group("scan", 5),
    ]);
    let catalog = discover(kernel, &DiscoveryConfig::default()).await.unwrap();

    let family = catalog.family("nl80211").unwrap();
    assert_eq!(family.mcast_groups.len(), 2);
    assert_eq!(family.group("mlme").unwrap().id, 3);
    assert_eq!(family.group("scan").unwrap().id, 5);
    assert_eq!(catalog.group_id("nl80211", "scan"), Some(5));
}

#[tokio::test]
async fn test_scenario_controller_unresolvable() {
    let kernel = FakeKernel::new(vec![FakeFamily::new(0x21, "nl80211", 1).group("scan", 5)]);
    let mut session = GenlSession::with_transport(kernel);

    let err = Catalog::discover(&mut session, &DiscoveryConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FamilyNotFound { ref name } if name == "nlctrl"));
    assert_eq!(err.stage().name(), "resolve");
    // Discovery stopped after the failed resolve
    assert_eq!(session.transport().request_count(), 1);
}

#[tokio::test]
async fn test_scenario_group_missing_id() {
    let kernel = FakeKernel::new(vec![
        FakeFamily::nlctrl(),
        FakeFamily::new(0x1c, "thermal", 1)
            .group("sampling", 4)
            .group_without_id("broken")
            .group("event", 5)
            .group_without_name(12),
    ]);
    let catalog = discover(kernel, &DiscoveryConfig::default()).await.unwrap();

    let family = catalog.family("thermal").unwrap();
    let names: Vec<&str> = family.mcast_groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["sampling", "event"]);
    assert!(family.group("broken").is_none());
}

#[tokio::test]
async fn test_family_without_groups_attribute() {
    let catalog = discover(typical_kernel(), &DiscoveryConfig::default())
        .await
        .unwrap();

    let family = catalog.family("tcp_metrics").unwrap();
    assert!(family.mcast_groups.is_empty());
    assert!(!family.has_mcast_groups());
}

#[tokio::test]
async fn test_records_are_well_formed() {
    let catalog = discover(typical_kernel(), &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(catalog.len(), 5);
    let mut names = BTreeSet::new();
    for family in &catalog {
        assert!(!family.name.is_empty());
        assert!(family.name.len() < GENL_NAMSIZ);
        assert!(family.id > 0);
        assert!(names.insert(family.name.clone()), "duplicate {}", family.name);

        let group_names: BTreeSet<_> = family.mcast_groups.iter().map(|g| &g.name).collect();
        let group_ids: BTreeSet<_> = family.mcast_groups.iter().map(|g| g.id).collect();
        assert_eq!(group_names.len(), family.mcast_groups.len());
        assert_eq!(group_ids.len(), family.mcast_groups.len());
        for group in &family.mcast_groups {
            assert!(!group.name.is_empty());
            assert!(group.name.len() < GENL_NAMSIZ);
        }
    }
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    fn fingerprint(catalog: &Catalog) -> BTreeSet<(u16, String, u32, String)> {
        catalog
            .iter()
            .flat_map(|f| {
                f.mcast_groups
                    .iter()
                    .map(|g| (f.id, f.name.clone(), g.id, g.name.clone()))
                    .chain(std::iter::once((f.id, f.name.clone(), 0, String::new())))
            })
            .collect()
    }

    let first = discover(typical_kernel(), &DiscoveryConfig::default())
        .await
        .unwrap();
    let second = discover(typical_kernel(), &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(fingerprint(&first), fingerprint(&second));
}

#[tokio::test]
async fn test_request_sequence() {
    let mut session = GenlSession::with_transport(typical_kernel());
    Catalog::discover(&mut session, &DiscoveryConfig::default())
        .await
        .unwrap();

    // resolve + dump + one query per family
    assert_eq!(session.transport().request_count(), 2 + 5);
}

#[tokio::test]
async fn test_failing_family_aborts_by_default() {
    let kernel = typical_kernel().failing("thermal");
    let err = discover(kernel, &DiscoveryConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err.errno(), Some(libc::EINVAL));
    assert!(err.to_string().contains("querying family thermal"));
}

#[tokio::test]
async fn test_failing_family_skipped_on_request() {
    let kernel = typical_kernel().failing("thermal");
    let config = DiscoveryConfig::new().policy(FailurePolicy::SkipFamily);
    let catalog = discover(kernel, &config).await.unwrap();

    assert_eq!(catalog.len(), 4);
    assert!(catalog.family("thermal").is_none());
    assert_eq!(catalog.group_id("nl80211", "mlme"), Some(9));
}

#[tokio::test]
async fn test_steps_driven_directly() {
    let mut session = GenlSession::with_transport(typical_kernel());
    let ctrl = session.resolve_controller("nlctrl").await.unwrap();
    assert_eq!(ctrl, 0x10);

    let families = list_families(&session).await.unwrap();
    assert_eq!(families.len(), 5);
    assert!(families.iter().all(|f| f.mcast_groups.is_empty()));

    let groups = resolve_groups(&session, "acpi_event").await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "acpi_mc_group");
    assert_eq!(groups[0].id, 2);

    let err = resolve_groups(&session, "wireguard").await.unwrap_err();
    assert!(err.is_not_found());
}
