//! Package graph, release closure and package persistence

pub mod package;
pub mod resolver;
pub mod store;

pub use package::{
    BumpResult, GroupId, Package, PackageGraph, PackageId, ReleaseGroup, ReleaseUnit,
    VersionChange,
};
pub use resolver::{resolve, resolve_many, ReleasePlan};
pub use store::{MemoryStore, PackageStore, TomlSnapshotStore, SNAPSHOT_FILE_NAME};
