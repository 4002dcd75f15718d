//! Loading and persisting the package graph
//!
//! Manifest parsing is an outer concern; the release core only sees the
//! [`PackageStore`] capability. The TOML snapshot format is what the CLI
//! reads and writes:
//!
//! ```toml
//! [[group]]
//! name = "client"
//! version = "2.0.0"
//!
//! [[package]]
//! name = "@fluid/core"
//! directory = "packages/core"
//! version = "2.0.0"
//! group = "client"
//! [package.dependencies]
//! "@fluid/utils" = "^2.0.0"
//! ```

use crate::domain::parse_version;
use crate::error::{ReleaseError, Result};
use crate::graph::package::{Package, PackageGraph, PackageId};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default snapshot file name
pub const SNAPSHOT_FILE_NAME: &str = "releasetrain.packages.toml";

/// Source and sink of package metadata
pub trait PackageStore: Send + Sync {
    /// Load the current package graph
    fn load(&self) -> Result<PackageGraph>;

    /// Persist the packages listed in `changed`
    fn save(&self, graph: &PackageGraph, changed: &BTreeSet<PackageId>) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default, rename = "group")]
    groups: Vec<GroupEntry>,
    #[serde(default, rename = "package")]
    packages: Vec<PackageEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupEntry {
    name: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackageEntry {
    name: String,
    #[serde(default)]
    directory: Option<PathBuf>,
    version: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

fn graph_from_snapshot(snapshot: SnapshotFile) -> Result<PackageGraph> {
    let mut graph = PackageGraph::new();
    let mut group_ids = BTreeMap::new();

    for entry in snapshot.groups {
        let id = graph.add_group(entry.name.clone(), parse_version(&entry.version)?)?;
        group_ids.insert(entry.name, id);
    }

    for entry in snapshot.packages {
        let group = match &entry.group {
            Some(name) => Some(*group_ids.get(name).ok_or_else(|| {
                ReleaseError::manifest(format!(
                    "Package '{}' names unknown release group '{}'",
                    entry.name, name
                ))
            })?),
            None => None,
        };

        let mut package = Package::new(entry.name.clone(), parse_version(&entry.version)?);
        if let Some(directory) = entry.directory {
            package = package.with_directory(directory);
        }
        package.dependencies = entry.dependencies;
        package.private = entry.private;
        graph.add_package(package, group)?;
    }

    for violation in graph.lockstep_violations() {
        warn!("Lockstep violation: {}", violation);
    }

    Ok(graph)
}

fn snapshot_from_graph(graph: &PackageGraph) -> SnapshotFile {
    SnapshotFile {
        groups: graph
            .groups()
            .map(|(_, g)| GroupEntry {
                name: g.name.clone(),
                version: g.version.to_string(),
            })
            .collect(),
        packages: graph
            .packages()
            .map(|(_, p)| PackageEntry {
                name: p.name.clone(),
                directory: Some(p.directory.clone()),
                version: p.version.to_string(),
                private: p.private,
                group: p.group.map(|g| graph.group(g).name.clone()),
                dependencies: p.dependencies.clone(),
            })
            .collect(),
    }
}

/// Package graph kept in a single TOML snapshot file
pub struct TomlSnapshotStore {
    path: PathBuf,
}

impl TomlSnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        TomlSnapshotStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PackageStore for TomlSnapshotStore {
    fn load(&self) -> Result<PackageGraph> {
        let content = fs::read_to_string(&self.path)?;
        let snapshot: SnapshotFile = toml::from_str(&content).map_err(|e| {
            ReleaseError::manifest(format!("Cannot parse {}: {}", self.path.display(), e))
        })?;
        graph_from_snapshot(snapshot)
    }

    fn save(&self, graph: &PackageGraph, changed: &BTreeSet<PackageId>) -> Result<()> {
        if changed.is_empty() {
            return Ok(());
        }
        // The snapshot is one file, so any change rewrites all of it.
        let content = toml::to_string_pretty(&snapshot_from_graph(graph))
            .map_err(|e| ReleaseError::manifest(format!("Cannot serialize snapshot: {}", e)))?;
        fs::write(&self.path, content)?;
        debug!(
            "Wrote {} changed package(s) to {}",
            changed.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    graph: Mutex<PackageGraph>,
    saves: Mutex<Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn new(graph: PackageGraph) -> Self {
        MemoryStore {
            graph: Mutex::new(graph),
            saves: Mutex::new(Vec::new()),
        }
    }

    /// The last saved graph
    pub fn snapshot(&self) -> PackageGraph {
        self.graph
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    /// Names of the packages written by each save call
    pub fn saves(&self) -> Vec<Vec<String>> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PackageStore for MemoryStore {
    fn load(&self) -> Result<PackageGraph> {
        Ok(self.snapshot())
    }

    fn save(&self, graph: &PackageGraph, changed: &BTreeSet<PackageId>) -> Result<()> {
        *self
            .graph
            .lock()
            .map_err(|_| ReleaseError::manifest("memory store lock poisoned"))? = graph.clone();
        let names = changed
            .iter()
            .map(|id| graph.package(*id).name.clone())
            .collect();
        self.saves
            .lock()
            .map_err(|_| ReleaseError::manifest("memory store lock poisoned"))?
            .push(names);
        Ok(())
    }
}
