//! Drives a release through the transition table
//!
//! Each state runs one step against the collaborators and reports an
//! [`Action`]. An error in a check or prompt takes that state's failure edge;
//! an error in a `Do*` step has no edge to take and ends the run in
//! [`ReleaseState::Failed`] straight away.

use crate::boundary::{private_member_warnings, BoundaryWarning};
use crate::capabilities::{Confirmation, Installer, PublishOutcome, PublishWatcher};
use crate::domain::{
    bump_branch_name, bump_with, detect_scheme, release_branch_name, BranchContext, BranchKind,
    ReleaseTag,
};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::graph::{
    resolve, BumpResult, PackageGraph, PackageId, PackageStore, ReleasePlan, ReleaseUnit,
    VersionChange,
};
use crate::ranges::set_dependency_range;
use crate::release::options::ReleaseOptions;
use crate::release::state::{Action, ReleaseState, TransitionTable};
use log::{debug, info, warn};
use semver::Version;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Upper bound on state visits in one run
const MAX_STEPS: usize = 10_000;

/// The external capabilities a release is driven through
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub repository: &'a dyn Repository,
    pub store: &'a dyn PackageStore,
    pub installer: &'a dyn Installer,
    pub publisher: &'a dyn PublishWatcher,
    pub confirmation: &'a dyn Confirmation,
}

/// How a release run ended
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Complete,
    /// `state` is the step that first failed, even if the run went through a
    /// recovery prompt before giving up.
    Failed { state: ReleaseState, reason: String },
}

impl ReleaseOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ReleaseOutcome::Complete)
    }
}

/// Side effects performed during a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseReport {
    pub visited: Vec<ReleaseState>,
    pub tags_pushed: Vec<String>,
    pub branches_created: Vec<String>,
    pub commits: Vec<String>,
    pub bumps: Vec<VersionChange>,
    /// HEAD when the run stopped
    pub last_commit: Option<String>,
    pub warnings: Vec<BoundaryWarning>,
}

/// Everything a finished run hands back
#[derive(Debug, Clone)]
pub struct ReleaseRun {
    pub outcome: ReleaseOutcome,
    pub report: ReleaseReport,
    pub plan: ReleasePlan,
    /// Package graph as last committed
    pub graph: PackageGraph,
}

/// Range rewrites made for dependents, waiting to be committed with the bump
struct Staged {
    graph: PackageGraph,
    ranges_rewritten: BTreeSet<PackageId>,
}

/// Load the package graph, resolve the release closure and run the release.
///
/// Errors that prevent the machine from starting at all (unknown target,
/// cyclic release dependencies, a bump the version scheme rejects) are
/// returned directly; everything after that ends in a [`ReleaseOutcome`].
pub fn run_release(options: &ReleaseOptions, collaborators: Collaborators<'_>) -> Result<ReleaseRun> {
    let graph = collaborators.store.load()?;
    let start = graph.find_unit(&options.target)?;
    let plan = resolve(&graph, start)?;

    let current = graph.unit_version(start);
    let next = bump_with(
        current,
        options.bump_type,
        detect_scheme(current)?,
        options.bump_options,
    )?;
    info!(
        "Releasing {} {} ({} bump to {} afterwards), {} unit(s) in plan",
        graph.unit_name(start),
        current,
        options.bump_type,
        next,
        plan.order.len()
    );

    let machine = ReleaseMachine::new(TransitionTable::release()?, options, collaborators, graph, plan);
    Ok(machine.run())
}

fn unit_tag(graph: &PackageGraph, unit: ReleaseUnit) -> String {
    ReleaseTag::new(graph.unit_name(unit), graph.unit_version(unit).clone()).to_string()
}

/// One release attempt
pub struct ReleaseMachine<'a> {
    table: TransitionTable,
    options: &'a ReleaseOptions,
    io: Collaborators<'a>,
    graph: PackageGraph,
    plan: ReleasePlan,
    cursor: usize,
    release_branch: Option<String>,
    bump_branch: Option<String>,
    next_version: Option<Version>,
    staged: Option<Staged>,
    integration_attempts: u32,
    first_failure: Option<(ReleaseState, String)>,
    report: ReleaseReport,
}

impl<'a> ReleaseMachine<'a> {
    pub fn new(
        table: TransitionTable,
        options: &'a ReleaseOptions,
        io: Collaborators<'a>,
        graph: PackageGraph,
        plan: ReleasePlan,
    ) -> Self {
        let mut report = ReleaseReport::default();
        for unit in &plan.order {
            report.warnings.extend(private_member_warnings(&graph, *unit));
        }
        ReleaseMachine {
            table,
            options,
            io,
            graph,
            plan,
            cursor: 0,
            release_branch: None,
            bump_branch: None,
            next_version: None,
            staged: None,
            integration_attempts: 0,
            first_failure: None,
            report,
        }
    }

    /// Advance from the entry state of the requested bump until a terminal state
    pub fn run(mut self) -> ReleaseRun {
        let mut state = ReleaseState::entry(self.options.bump_type);
        let outcome = loop {
            self.report.visited.push(state);
            match state {
                ReleaseState::ReleaseComplete => break ReleaseOutcome::Complete,
                ReleaseState::Failed => break self.failed_outcome(),
                _ => {}
            }
            if self.report.visited.len() > MAX_STEPS {
                self.first_failure
                    .get_or_insert((state, "step limit exceeded".to_string()));
                break self.failed_outcome();
            }

            debug!("Entering {}", state);
            let (action, error) = match self.execute(state) {
                Ok(action) => (action, None),
                Err(e) => (Action::Failure, Some(e)),
            };

            let next = self.table.next(state, action);
            match (&error, next) {
                (Some(e), _) => {
                    warn!("{} failed: {}", state, e);
                    self.first_failure.get_or_insert((state, e.to_string()));
                }
                (None, None) => {
                    self.first_failure.get_or_insert((
                        state,
                        format!("no {:?} transition from {}", action, state),
                    ));
                }
                (None, Some(_)) if action == Action::Success && state.is_check() => {
                    self.first_failure = None;
                }
                _ => {}
            }
            state = next.unwrap_or(ReleaseState::Failed);
        };

        self.report.last_commit = self.io.repository.head_commit().ok();
        ReleaseRun {
            outcome,
            report: self.report,
            plan: self.plan,
            graph: self.graph,
        }
    }

    fn failed_outcome(&self) -> ReleaseOutcome {
        let (state, reason) = self
            .first_failure
            .clone()
            .unwrap_or((ReleaseState::Failed, "release failed".to_string()));
        ReleaseOutcome::Failed { state, reason }
    }

    fn execute(&mut self, state: ReleaseState) -> Result<Action> {
        match state {
            ReleaseState::DoMajorRelease
            | ReleaseState::DoMinorRelease
            | ReleaseState::DoPatchRelease => {
                info!("{}: {}", state, self.graph.unit_name(self.start_unit()?));
                Ok(Action::Success)
            }
            ReleaseState::CheckMainNextIntegrated => self.check_main_next_integrated(),
            ReleaseState::PromptToIntegrateNext => self.prompt_to_integrate_next(),
            ReleaseState::CheckOnMainBranch => self.check_on_main_branch(),
            ReleaseState::CheckReleaseGroupIsBumped => self.check_release_group_is_bumped(),
            ReleaseState::PromptToCreateReleaseBranch => self.prompt_to_create_release_branch(),
            ReleaseState::DoCreateReleaseBranch => self.do_create_release_branch(),
            ReleaseState::CheckOnReleaseBranch => self.check_on_release_branch(),
            ReleaseState::CheckReleaseIsDone => self.check_release_is_done(),
            ReleaseState::PromptToRunTypeTests => self.prompt_to_run_type_tests(),
            ReleaseState::PromptToRelease => self.prompt_to_release(),
            ReleaseState::DoReleaseTag => self.do_release_tag(),
            ReleaseState::CheckPublished => self.check_published(),
            ReleaseState::DoUpdateDependents => self.do_update_dependents(),
            ReleaseState::PromptToCommitBump => self.prompt_to_commit_bump(),
            ReleaseState::DoReleaseGroupBump => self.do_release_group_bump(),
            ReleaseState::PromptToPRBump => self.prompt_to_pr_bump(),
            ReleaseState::CheckMoreUnitsToRelease => self.check_more_units_to_release(),
            ReleaseState::ReleaseComplete | ReleaseState::Failed => {
                Err(ReleaseError::StateMachine(format!("{} is terminal", state)))
            }
        }
    }

    fn start_unit(&self) -> Result<ReleaseUnit> {
        self.plan
            .order
            .first()
            .copied()
            .ok_or_else(|| ReleaseError::StateMachine("release plan is empty".to_string()))
    }

    fn current_unit(&self) -> Result<ReleaseUnit> {
        self.plan.order.get(self.cursor).copied().ok_or_else(|| {
            ReleaseError::StateMachine(format!("no release unit at position {}", self.cursor))
        })
    }

    fn current_tag(&self) -> Result<String> {
        Ok(unit_tag(&self.graph, self.current_unit()?))
    }

    fn branch(&self) -> Result<BranchContext> {
        Ok(BranchContext::new(
            self.io.repository.current_branch()?,
            &self.options.branches,
        ))
    }

    fn ask(&self, prompt: &str) -> Result<Action> {
        if self.io.confirmation.confirm(prompt)? {
            Ok(Action::Success)
        } else {
            Err(ReleaseError::UserAborted)
        }
    }

    fn check_main_next_integrated(&mut self) -> Result<Action> {
        let branches = &self.options.branches;
        let branch = self.branch()?;
        if branch.kind != BranchKind::Main {
            return Err(ReleaseError::preflight(format!(
                "major releases start from {}, not {}",
                branches.main, branch.name
            )));
        }
        if !self.io.repository.is_merged(&branches.next, &branches.main)? {
            return Err(ReleaseError::preflight(format!(
                "{} is not merged into {}",
                branches.next, branches.main
            )));
        }
        Ok(Action::Success)
    }

    fn prompt_to_integrate_next(&mut self) -> Result<Action> {
        self.integration_attempts += 1;
        if self.integration_attempts > self.options.max_integration_attempts {
            return Err(ReleaseError::preflight(format!(
                "{} still not merged into {} after {} attempts",
                self.options.branches.next,
                self.options.branches.main,
                self.options.max_integration_attempts
            )));
        }
        self.ask(&format!(
            "Merge {} into {}, then continue?",
            self.options.branches.next, self.options.branches.main
        ))
    }

    fn check_on_main_branch(&mut self) -> Result<Action> {
        let branch = self.branch()?;
        if !branch.is_development_branch() {
            return Err(ReleaseError::preflight(format!(
                "minor and major releases start from {} or {}, not {}",
                self.options.branches.main, self.options.branches.next, branch.name
            )));
        }
        Ok(Action::Success)
    }

    fn check_release_group_is_bumped(&mut self) -> Result<Action> {
        let unit = self.start_unit()?;
        let name = self.graph.unit_name(unit);
        let current = self.graph.unit_version(unit);
        let tags = self.io.repository.list_tags()?;

        if let Some(latest) = ReleaseTag::versions_for(name, &tags).into_iter().max() {
            if *current <= latest {
                return Err(ReleaseError::preflight(format!(
                    "{} is at {} but {}_v{} is already tagged; bump it before releasing",
                    name, current, name, latest
                )));
            }
        }
        Ok(Action::Success)
    }

    fn prompt_to_create_release_branch(&mut self) -> Result<Action> {
        let unit = self.start_unit()?;
        let branch = release_branch_name(
            &self.options.branches.release_prefix,
            self.graph.unit_name(unit),
            self.graph.unit_version(unit),
        )?;
        let action = self.ask(&format!("Create release branch {}?", branch))?;
        self.release_branch = Some(branch);
        Ok(action)
    }

    fn do_create_release_branch(&mut self) -> Result<Action> {
        let branch = self
            .release_branch
            .clone()
            .ok_or_else(|| ReleaseError::StateMachine("no release branch chosen".to_string()))?;
        self.io.repository.create_branch(&branch)?;
        info!("Created release branch {}", branch);
        self.report.branches_created.push(branch);
        Ok(Action::Success)
    }

    fn check_on_release_branch(&mut self) -> Result<Action> {
        let branch = self.branch()?;
        if !branch.is_release_branch() {
            return Err(ReleaseError::preflight(format!(
                "patch releases ship from {}/ branches, not {}",
                self.options.branches.release_prefix, branch.name
            )));
        }
        Ok(Action::Success)
    }

    /// Checks the current unit and every unit after it, so an earlier release
    /// in the plan is never tagged while a later one is already done.
    fn check_release_is_done(&mut self) -> Result<Action> {
        for unit in self.plan.order.iter().skip(self.cursor) {
            let tag = unit_tag(&self.graph, *unit);
            if self.io.repository.tag_exists(&tag)? {
                return Err(ReleaseError::TagAlreadyExists(tag));
            }
        }
        Ok(Action::Success)
    }

    fn prompt_to_run_type_tests(&mut self) -> Result<Action> {
        if self.options.skip_type_tests {
            debug!("Type tests skipped by configuration");
            return Ok(Action::Success);
        }
        let unit = self.current_unit()?;
        let name = self.graph.unit_name(unit);
        if self.io.confirmation.confirm(&format!(
            "Have the type compatibility tests for {} {} passed?",
            name,
            self.graph.unit_version(unit)
        ))? {
            Ok(Action::Success)
        } else {
            Err(ReleaseError::preflight(format!(
                "type compatibility tests for {} did not pass",
                name
            )))
        }
    }

    fn prompt_to_release(&mut self) -> Result<Action> {
        let tag = self.current_tag()?;
        self.ask(&format!("Push tag {} and publish?", tag))
    }

    fn do_release_tag(&mut self) -> Result<Action> {
        let tag = self.current_tag()?;
        self.io.repository.push_tag(&tag)?;
        info!("Pushed {}", tag);
        self.report.tags_pushed.push(tag);
        Ok(Action::Success)
    }

    fn check_published(&mut self) -> Result<Action> {
        let unit = self.current_unit()?;
        let version = self.graph.unit_version(unit).clone();
        for id in self.graph.published_members(unit) {
            let name = &self.graph.package(id).name;
            if self.io.publisher.wait_for_publish(name, &version)? == PublishOutcome::TimedOut {
                return Err(ReleaseError::PublishTimeout {
                    package: name.clone(),
                    version: version.to_string(),
                });
            }
        }
        Ok(Action::Success)
    }

    fn do_update_dependents(&mut self) -> Result<Action> {
        let unit = self.current_unit()?;
        let version = self.graph.unit_version(unit).clone();
        let targets = self.graph.published_members(unit);

        let mut scope: Vec<PackageId> = self
            .plan
            .after(unit)
            .iter()
            .flat_map(|u| self.graph.unit_members(*u))
            .collect();
        scope.extend(self.plan.range_only.iter().copied());

        let mut working = self.graph.clone();
        let changed = set_dependency_range(&mut working, &scope, &targets, &version);
        if changed.is_empty() && self.cursor == 0 && self.plan.order.len() == 1 {
            self.report.warnings.push(BoundaryWarning::NoDependents {
                unit: self.graph.unit_name(unit).to_string(),
            });
        }
        info!(
            "{} dependent package(s) now require {} {}",
            changed.len(),
            self.graph.unit_name(unit),
            version
        );

        self.staged = Some(Staged {
            graph: working,
            ranges_rewritten: changed,
        });
        Ok(Action::Success)
    }

    fn prompt_to_commit_bump(&mut self) -> Result<Action> {
        let unit = self.current_unit()?;
        let current = self.graph.unit_version(unit);
        let next = bump_with(
            current,
            self.options.bump_type,
            detect_scheme(current)?,
            self.options.bump_options,
        )?;
        let staged = self.staged.as_ref().map_or(0, |s| s.ranges_rewritten.len());

        let action = self.ask(&format!(
            "Commit {} dependency update(s) and bump {} from {} to {}?",
            staged,
            self.graph.unit_name(unit),
            current,
            next
        ))?;
        self.next_version = Some(next);
        Ok(action)
    }

    fn do_release_group_bump(&mut self) -> Result<Action> {
        let unit = self.current_unit()?;
        let next = self
            .next_version
            .take()
            .ok_or_else(|| ReleaseError::StateMachine("no bump version computed".to_string()))?;
        let staged = self.staged.take().unwrap_or_else(|| Staged {
            graph: self.graph.clone(),
            ranges_rewritten: BTreeSet::new(),
        });

        let mut working = staged.graph;
        let change = working.set_unit_version(unit, &next);
        let members = working.unit_members(unit);
        let published = working.published_members(unit);
        let mut result = BumpResult {
            ranges_rewritten: staged.ranges_rewritten,
            versions_changed: vec![change.clone()],
        };
        result
            .ranges_rewritten
            .extend(set_dependency_range(&mut working, &members, &published, &next));

        let name = working.unit_name(unit).to_string();
        let branch = bump_branch_name(&name, self.options.bump_type, &next);
        self.io.repository.create_branch(&branch)?;
        self.report.branches_created.push(branch.clone());

        let touched = result.touched_packages(&working);
        self.io.store.save(&working, &touched)?;

        let commit = match self.install_and_commit(&working, &result, &name, &next) {
            Ok(commit) => commit,
            Err(e) => {
                // Put the package files back the way the last commit left them.
                if let Err(restore) = self.io.store.save(&self.graph, &touched) {
                    warn!("Cannot restore packages after failed bump: {}", restore);
                }
                return Err(e);
            }
        };
        info!("Bumped {} from {} to {} in {}", name, change.from, next, commit);

        self.report.commits.push(commit);
        self.report.bumps.push(change);
        self.bump_branch = Some(branch);
        self.graph = working;
        Ok(Action::Success)
    }

    fn install_and_commit(
        &self,
        working: &PackageGraph,
        result: &BumpResult,
        name: &str,
        next: &Version,
    ) -> Result<String> {
        if result.needs_install() {
            let directories: Vec<PathBuf> = result
                .ranges_rewritten
                .iter()
                .map(|id| working.package(*id).directory.clone())
                .collect();
            if !self.io.installer.ensure_installed(&directories)? {
                return Err(ReleaseError::install(format!(
                    "install after bumping {} to {} did not succeed",
                    name, next
                )));
            }
        }

        self.io.repository.commit(&format!(
            "Bump {} to {} ({})",
            name, next, self.options.bump_type
        ))
    }

    fn prompt_to_pr_bump(&mut self) -> Result<Action> {
        let branch = self
            .bump_branch
            .clone()
            .ok_or_else(|| ReleaseError::StateMachine("no bump branch created".to_string()))?;
        self.ask(&format!("Open a pull request for {}, then continue?", branch))
    }

    fn check_more_units_to_release(&mut self) -> Result<Action> {
        self.cursor += 1;
        match self.plan.order.get(self.cursor) {
            Some(unit) => {
                info!("Next release unit: {}", self.graph.unit_name(*unit));
                Ok(Action::Success)
            }
            None => Ok(Action::Failure),
        }
    }
}
