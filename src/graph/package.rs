use crate::error::{ReleaseError, Result};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Index of a package in a [`PackageGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub usize);

/// Index of a release group in a [`PackageGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

/// The thing that gets tagged and versioned: a whole release group, or a
/// package that belongs to no group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReleaseUnit {
    Group(GroupId),
    Package(PackageId),
}

/// A single package in the monorepo
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub directory: PathBuf,
    pub version: Version,
    /// Dependency name -> declared range
    pub dependencies: BTreeMap<String, String>,
    /// Private packages are never published
    pub private: bool,
    /// Owning release group, set when the package is added to the graph
    pub group: Option<GroupId>,
}

impl Package {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        let name = name.into();
        Package {
            directory: PathBuf::from(&name),
            name,
            version,
            dependencies: BTreeMap::new(),
            private: false,
            group: None,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }
}

/// Packages versioned and released together
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseGroup {
    pub name: String,
    pub members: Vec<PackageId>,
    pub version: Version,
}

/// One unit's version moving during a bump
#[derive(Debug, Clone, PartialEq)]
pub struct VersionChange {
    pub unit: ReleaseUnit,
    pub from: Version,
    pub to: Version,
}

/// Everything a single resolve-and-update pass changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BumpResult {
    /// Packages whose dependency ranges were rewritten
    pub ranges_rewritten: BTreeSet<PackageId>,
    /// Units whose own version changed
    pub versions_changed: Vec<VersionChange>,
}

impl BumpResult {
    pub fn is_empty(&self) -> bool {
        self.ranges_rewritten.is_empty() && self.versions_changed.is_empty()
    }

    /// Installation is only needed when some declared range moved
    pub fn needs_install(&self) -> bool {
        !self.ranges_rewritten.is_empty()
    }

    pub fn merge(&mut self, other: BumpResult) {
        self.ranges_rewritten.extend(other.ranges_rewritten);
        self.versions_changed.extend(other.versions_changed);
    }

    /// Every package that has to be written back to disk
    pub fn touched_packages(&self, graph: &PackageGraph) -> BTreeSet<PackageId> {
        let mut touched = self.ranges_rewritten.clone();
        for change in &self.versions_changed {
            touched.extend(graph.unit_members(change.unit));
        }
        touched
    }
}

/// All packages and release groups of the monorepo.
///
/// Packages and groups live in arenas addressed by [`PackageId`] and [`GroupId`];
/// who-depends-on-whom is derived from declared ranges whenever it is asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageGraph {
    packages: Vec<Package>,
    groups: Vec<ReleaseGroup>,
    by_name: HashMap<String, PackageId>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty release group
    pub fn add_group(&mut self, name: impl Into<String>, version: Version) -> Result<GroupId> {
        let name = name.into();
        if self.groups.iter().any(|g| g.name == name) {
            return Err(ReleaseError::manifest(format!(
                "Duplicate release group '{}'",
                name
            )));
        }
        self.groups.push(ReleaseGroup {
            name,
            members: Vec::new(),
            version,
        });
        Ok(GroupId(self.groups.len() - 1))
    }

    /// Add a package, optionally as a member of `group`
    pub fn add_package(&mut self, mut package: Package, group: Option<GroupId>) -> Result<PackageId> {
        if self.by_name.contains_key(&package.name) {
            return Err(ReleaseError::manifest(format!(
                "Duplicate package '{}'",
                package.name
            )));
        }
        if let Some(group_id) = group {
            if group_id.0 >= self.groups.len() {
                return Err(ReleaseError::manifest(format!(
                    "Package '{}' refers to an unknown release group",
                    package.name
                )));
            }
        }

        let id = PackageId(self.packages.len());
        package.group = group;
        self.by_name.insert(package.name.clone(), id);
        self.packages.push(package);
        if let Some(group_id) = group {
            self.groups[group_id.0].members.push(id);
        }
        Ok(id)
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id.0]
    }

    pub fn group(&self, id: GroupId) -> &ReleaseGroup {
        &self.groups[id.0]
    }

    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i), p))
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &ReleaseGroup)> {
        self.groups.iter().enumerate().map(|(i, g)| (GroupId(i), g))
    }

    pub fn find_package(&self, name: &str) -> Result<PackageId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ReleaseError::PackageNotFound(name.to_string()))
    }

    /// Resolve a release target by name.
    ///
    /// Group names win; a package name resolves to its owning group if it has one.
    pub fn find_unit(&self, name: &str) -> Result<ReleaseUnit> {
        if let Some((id, _)) = self.groups().find(|(_, g)| g.name == name) {
            return Ok(ReleaseUnit::Group(id));
        }
        let package = self.find_package(name)?;
        Ok(self.unit_of(package))
    }

    pub fn unit_of(&self, package: PackageId) -> ReleaseUnit {
        match self.package(package).group {
            Some(group) => ReleaseUnit::Group(group),
            None => ReleaseUnit::Package(package),
        }
    }

    pub fn unit_members(&self, unit: ReleaseUnit) -> Vec<PackageId> {
        match unit {
            ReleaseUnit::Group(group) => self.group(group).members.clone(),
            ReleaseUnit::Package(package) => vec![package],
        }
    }

    /// Members whose versions are published and so follow the unit's version
    pub fn published_members(&self, unit: ReleaseUnit) -> Vec<PackageId> {
        self.unit_members(unit)
            .into_iter()
            .filter(|id| !self.package(*id).private)
            .collect()
    }

    pub fn unit_name(&self, unit: ReleaseUnit) -> &str {
        match unit {
            ReleaseUnit::Group(group) => &self.group(group).name,
            ReleaseUnit::Package(package) => &self.package(package).name,
        }
    }

    pub fn unit_version(&self, unit: ReleaseUnit) -> &Version {
        match unit {
            ReleaseUnit::Group(group) => &self.group(group).version,
            ReleaseUnit::Package(package) => &self.package(package).version,
        }
    }

    /// Move a unit to `version`, keeping every published member in lockstep
    pub fn set_unit_version(&mut self, unit: ReleaseUnit, version: &Version) -> VersionChange {
        let from = self.unit_version(unit).clone();
        if let ReleaseUnit::Group(group) = unit {
            self.groups[group.0].version = version.clone();
        }
        for member in self.unit_members(unit) {
            let package = &mut self.packages[member.0];
            if !package.private || unit == ReleaseUnit::Package(member) {
                package.version = version.clone();
            }
        }
        VersionChange {
            unit,
            from,
            to: version.clone(),
        }
    }

    /// Packages that declare a dependency on `package`
    pub fn dependents_of(&self, package: PackageId) -> Vec<PackageId> {
        let name = &self.package(package).name;
        self.packages()
            .filter(|(id, p)| *id != package && p.depends_on(name))
            .map(|(id, _)| id)
            .collect()
    }

    /// Reverse adjacency for every package, indexed by [`PackageId`]
    pub fn dependents_index(&self) -> Vec<Vec<PackageId>> {
        let mut index = vec![Vec::new(); self.packages.len()];
        for (id, package) in self.packages() {
            for dependency in package.dependencies.keys() {
                if let Some(target) = self.by_name.get(dependency) {
                    if *target != id {
                        index[target.0].push(id);
                    }
                }
            }
        }
        index
    }

    /// Published group members whose version drifted from the group version
    pub fn lockstep_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (_, group) in self.groups() {
            for member in &group.members {
                let package = self.package(*member);
                if !package.private && package.version != group.version {
                    violations.push(format!(
                        "{} is at {} but release group {} is at {}",
                        package.name, package.version, group.name, group.version
                    ));
                }
            }
        }
        violations
    }
}

impl fmt::Display for ReleaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseUnit::Group(id) => write!(f, "group#{}", id.0),
            ReleaseUnit::Package(id) => write!(f, "package#{}", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (PackageGraph, GroupId) {
        let mut graph = PackageGraph::new();
        let client = graph.add_group("client", Version::new(1, 0, 0)).unwrap();
        graph
            .add_package(Package::new("a", Version::new(1, 0, 0)), Some(client))
            .unwrap();
        graph
            .add_package(
                Package::new("b", Version::new(1, 0, 0)).with_dependency("a", "1.0.0"),
                Some(client),
            )
            .unwrap();
        graph
            .add_package(
                Package::new("tool", Version::new(0, 3, 0)).with_dependency("b", "^1.0.0"),
                None,
            )
            .unwrap();
        (graph, client)
    }

    #[test]
    fn test_duplicate_package_rejected() {
        let (mut graph, _) = sample();
        let err = graph.add_package(Package::new("a", Version::new(1, 0, 0)), None);
        assert!(err.is_err());
    }

    #[test]
    fn test_find_unit_prefers_group() {
        let (graph, client) = sample();
        assert_eq!(graph.find_unit("client").unwrap(), ReleaseUnit::Group(client));
        assert_eq!(graph.find_unit("a").unwrap(), ReleaseUnit::Group(client));
        let tool = graph.find_package("tool").unwrap();
        assert_eq!(graph.find_unit("tool").unwrap(), ReleaseUnit::Package(tool));
        assert!(matches!(
            graph.find_unit("missing"),
            Err(ReleaseError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_dependents_of() {
        let (graph, _) = sample();
        let a = graph.find_package("a").unwrap();
        let b = graph.find_package("b").unwrap();
        let tool = graph.find_package("tool").unwrap();
        assert_eq!(graph.dependents_of(a), vec![b]);
        assert_eq!(graph.dependents_of(b), vec![tool]);
        assert_eq!(graph.dependents_index()[b.0], vec![tool]);
    }

    #[test]
    fn test_set_unit_version_lockstep() {
        let (mut graph, client) = sample();
        let change = graph.set_unit_version(ReleaseUnit::Group(client), &Version::new(1, 1, 0));
        assert_eq!(change.from, Version::new(1, 0, 0));
        assert_eq!(graph.group(client).version, Version::new(1, 1, 0));
        for member in graph.unit_members(ReleaseUnit::Group(client)) {
            assert_eq!(graph.package(member).version, Version::new(1, 1, 0));
        }
        assert!(graph.lockstep_violations().is_empty());
    }

    #[test]
    fn test_lockstep_violation_reported() {
        let (mut graph, _) = sample();
        let a = graph.find_package("a").unwrap();
        graph.package_mut(a).version = Version::new(1, 0, 1);
        assert_eq!(graph.lockstep_violations().len(), 1);
    }
}
