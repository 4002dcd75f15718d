use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::path::{Path, PathBuf};

use release_train::boundary::{self, BoundaryWarning};
use release_train::capabilities::{
    AutoConfirm, CommandInstaller, CommandProbe, Confirmation, ConsolePrompt, Installer,
    PollingPublishWatcher,
};
use release_train::config::{self, Config};
use release_train::domain::{bump_with, detect_scheme, parse_version, BumpOptions, BumpType, VersionScheme};
use release_train::git::{Git2Repository, Repository};
use release_train::graph::{resolve, PackageStore, TomlSnapshotStore, SNAPSHOT_FILE_NAME};
use release_train::ranges::{set_dependency_range_styled, RangeStyle};
use release_train::release::{run_release, Collaborators, ReleaseOptions};
use release_train::ui;

#[derive(Parser)]
#[command(
    name = "release-train",
    version,
    about = "Version and release interdependent packages of a monorepo"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        short,
        long,
        global = true,
        default_value = SNAPSHOT_FILE_NAME,
        help = "Package snapshot file"
    )]
    packages: PathBuf,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the release flow for a release group or package
    Release {
        #[arg(short, long, help = "Release group or package name")]
        target: String,

        #[arg(long = "type", value_name = "TYPE", help = "patch, minor or major")]
        bump_type: BumpType,

        #[arg(short, long, help = "Answer yes to every prompt")]
        yes: bool,

        #[arg(long, help = "Use this build id as the patch component")]
        build_id: Option<u64>,

        #[arg(long, help = "Append a dev build suffix to internal versions")]
        dev_build: Option<u64>,
    },
    /// Pin every dependency on a package to a version, without releasing
    BumpDeps {
        #[arg(short, long, help = "Release group or package whose dependents are updated")]
        target: String,

        #[arg(long, help = "Version the dependents should require")]
        version: String,

        #[arg(long, default_value = "exact", help = "exact, caret or tilde")]
        style: RangeStyle,

        #[arg(long, help = "Run the install command afterwards")]
        install: bool,
    },
    /// Print the version a bump would produce
    NextVersion {
        version: String,

        #[arg(long = "type", value_name = "TYPE")]
        bump_type: BumpType,

        #[arg(long, help = "Expected scheme; detected from the version when omitted")]
        scheme: Option<VersionScheme>,

        #[arg(long)]
        build_id: Option<u64>,

        #[arg(long)]
        dev_build: Option<u64>,
    },
    /// Print the scheme a version belongs to
    Scheme { version: String },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Release {
            target,
            bump_type,
            yes,
            build_id,
            dev_build,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let options = ReleaseOptions::from_config(target, bump_type, &config)
                .with_build_id(build_id)
                .with_dev_build(dev_build);
            release(&config, &options, &cli.packages, yes)
        }
        Command::BumpDeps {
            target,
            version,
            style,
            install,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            bump_deps(&config, &cli.packages, &target, &version, style, install)
        }
        Command::NextVersion {
            version,
            bump_type,
            scheme,
            build_id,
            dev_build,
        } => {
            let version = parse_version(&version)?;
            let scheme = match scheme {
                Some(scheme) => scheme,
                None => detect_scheme(&version)?,
            };
            let options = BumpOptions {
                build_id,
                dev_build,
            };
            println!("{}", bump_with(&version, bump_type, scheme, options)?);
            Ok(())
        }
        Command::Scheme { version } => {
            println!("{}", detect_scheme(&parse_version(&version)?)?);
            Ok(())
        }
    }
}

fn release(config: &Config, options: &ReleaseOptions, packages: &Path, yes: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let repository = Git2Repository::open(&root, config.behavior.remote.as_str())
        .context("Not inside a git repository")?;
    let store = TomlSnapshotStore::new(packages);

    let graph = store
        .load()
        .with_context(|| format!("Cannot load packages from {}", packages.display()))?;
    for warning in boundary::lockstep_warnings(&graph) {
        ui::display_boundary_warning(&warning);
    }
    let plan = resolve(&graph, graph.find_unit(&options.target)?)?;
    ui::display_plan(&graph, &plan);

    let installer = CommandInstaller::new(config.install.command.as_str(), &root);
    let publisher = PollingPublishWatcher::new(
        CommandProbe::new(config.publish.probe_command.as_str()),
        config.publish.poll_interval(),
        config.publish.max_wait(),
    );
    let confirmation: Box<dyn Confirmation> = if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(ConsolePrompt)
    };

    let run = run_release(
        options,
        Collaborators {
            repository: &repository,
            store: &store,
            installer: &installer,
            publisher: &publisher,
            confirmation: confirmation.as_ref(),
        },
    )?;
    ui::display_run(&run);

    if !run.outcome.is_complete() {
        std::process::exit(1);
    }
    Ok(())
}

fn bump_deps(
    config: &Config,
    packages: &Path,
    target: &str,
    version: &str,
    style: RangeStyle,
    install: bool,
) -> Result<()> {
    let version = parse_version(version)?;
    let store = TomlSnapshotStore::new(packages);
    let mut graph = store
        .load()
        .with_context(|| format!("Cannot load packages from {}", packages.display()))?;

    let unit = graph.find_unit(target)?;
    let name = graph.unit_name(unit).to_string();
    let targets = graph.published_members(unit);

    // Outside a release an existing tag is only worth a warning.
    match Git2Repository::open(".", config.behavior.remote.as_str()).and_then(|r| r.list_tags()) {
        Ok(tags) => {
            let mut warnings: Vec<BoundaryWarning> = boundary::unparsable_tag_warnings(&tags, &name);
            warnings.extend(boundary::tag_collision_warning(&tags, &name, &version));
            for warning in warnings {
                ui::display_boundary_warning(&warning);
            }
        }
        Err(e) => debug!("Skipping tag checks: {}", e),
    }

    let scope: Vec<_> = graph.packages().map(|(id, _)| id).collect();
    let changed = set_dependency_range_styled(&mut graph, &scope, &targets, &version, style);
    if changed.is_empty() {
        ui::display_status(&format!("Every dependent of {} already requires {}", name, version));
        return Ok(());
    }

    store.save(&graph, &changed)?;
    for id in &changed {
        ui::display_success(&format!(
            "{} now requires {} {}",
            graph.package(*id).name,
            name,
            version
        ));
    }

    if install {
        let root = std::env::current_dir()?;
        let directories: Vec<PathBuf> = changed
            .iter()
            .map(|id| graph.package(*id).directory.clone())
            .collect();
        let installer = CommandInstaller::new(config.install.command.as_str(), &root);
        if !installer.ensure_installed(&directories)? {
            ui::display_error("Install did not succeed");
            std::process::exit(1);
        }
    }
    Ok(())
}
