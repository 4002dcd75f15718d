use release_train::boundary::{
    lockstep_warnings, private_member_warnings, tag_collision_warning, unparsable_tag_warnings,
    BoundaryWarning,
};
use release_train::graph::{Package, PackageGraph};
use semver::Version;

fn tags(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_tag_exists_display() {
    let warning = BoundaryWarning::TagExistsOutsideRelease {
        tag: "client_v2.0.0".to_string(),
    };
    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("client_v2.0.0"),
        "Message should contain the tag, got: {}",
        display_msg
    );
}

#[test]
fn test_private_member_display() {
    let warning = BoundaryWarning::PrivateMemberNotBumped {
        package: "examples".to_string(),
        group: "client".to_string(),
    };
    let display_msg = warning.to_string();
    assert!(display_msg.contains("examples"));
    assert!(display_msg.contains("client"));
}

#[test]
fn test_tag_collision_detected() {
    let existing = tags(&["client_v2.0.0", "server_v0.5.0"]);
    assert_eq!(
        tag_collision_warning(&existing, "client", &Version::new(2, 0, 0)),
        Some(BoundaryWarning::TagExistsOutsideRelease {
            tag: "client_v2.0.0".to_string()
        })
    );
    assert_eq!(
        tag_collision_warning(&existing, "client", &Version::new(2, 1, 0)),
        None
    );
}

#[test]
fn test_unparsable_tags_reported() {
    let existing = tags(&["client_vnext", "client_v2.0.0", "clients_v1"]);
    let warnings = unparsable_tag_warnings(&existing, "client");
    assert_eq!(
        warnings,
        vec![BoundaryWarning::UnparsableTag {
            tag: "client_vnext".to_string()
        }]
    );
}

#[test]
fn test_private_members_of_group() {
    let mut graph = PackageGraph::new();
    let group = graph.add_group("client", Version::new(2, 0, 0)).unwrap();
    graph
        .add_package(Package::new("core", Version::new(2, 0, 0)), Some(group))
        .unwrap();
    graph
        .add_package(
            Package::new("demo", Version::new(0, 1, 0)).private(),
            Some(group),
        )
        .unwrap();

    let unit = graph.find_unit("client").unwrap();
    let warnings = private_member_warnings(&graph, unit);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("demo"));
    assert!(lockstep_warnings(&graph).is_empty());
}

#[test]
fn test_lockstep_drift_reported() {
    let mut graph = PackageGraph::new();
    let group = graph.add_group("client", Version::new(2, 0, 0)).unwrap();
    graph
        .add_package(Package::new("core", Version::new(1, 9, 0)), Some(group))
        .unwrap();

    let warnings = lockstep_warnings(&graph);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().starts_with("Lockstep violation"));
}
