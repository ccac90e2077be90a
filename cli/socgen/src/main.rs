//! socgen CLI: build SoC firmware from a description and load it into ROM.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use commands::build::BuildArgs;
use manifest::SocgenManifest;

#[derive(Parser)]
#[command(name = "socgen", version, about = "SoC firmware build orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Less log output (-q errors only, -qq silent)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new socgen project
    Init {
        /// Project name
        name: String,
    },
    /// Render, run, and optionally load the firmware build
    Build {
        #[command(flatten)]
        build: BuildFlags,
        /// Render the plan and write the build script without running it
        #[arg(long)]
        no_execute: bool,
        /// Load the produced firmware into the ROM
        #[arg(long)]
        init: bool,
        /// Write the initialized SoC description to this file (with --init)
        #[arg(long)]
        emit_soc: Option<String>,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
    /// Render the build plan into the build directory without running it
    Plan {
        #[command(flatten)]
        build: BuildFlags,
        /// Print the contents of each rendered file
        #[arg(long)]
        show: bool,
    },
    /// Inspect SoC descriptions
    Soc {
        #[command(subcommand)]
        action: SocAction,
    },
    /// Check toolchain and project status
    Doctor,
    /// Remove the build directory
    Clean {
        /// Also remove the LiteDRAM build directory
        #[arg(long)]
        litedram: bool,
    },
}

#[derive(Args)]
struct BuildFlags {
    /// SoC description (.soc.toml); default from socgen.toml or socs/
    #[arg(long)]
    soc: Option<String>,
    /// Run name used for generated file names
    #[arg(long)]
    name: Option<String>,
    /// Build directory
    #[arg(long)]
    build_dir: Option<String>,
    /// LiteDRAM build directory
    #[arg(long)]
    litedram_dir: Option<String>,
    /// Firmware source tree
    #[arg(long)]
    software_dir: Option<String>,
    /// Extra template parameter (KEY=VALUE, repeatable)
    #[arg(short = 'D', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
    /// Zero-pad a trailing partial firmware word instead of failing
    #[arg(long)]
    pad_firmware: bool,
}

impl BuildFlags {
    fn into_args(self) -> BuildArgs {
        BuildArgs {
            soc: self.soc,
            name: self.name,
            build_dir: self.build_dir,
            litedram_dir: self.litedram_dir,
            software_dir: self.software_dir,
            params: self.params,
            pad_firmware: self.pad_firmware,
            ..BuildArgs::default()
        }
    }
}

#[derive(Subcommand)]
enum SocAction {
    /// List built-in and project descriptions
    List,
    /// Show the memory map and interrupts of a description
    Describe {
        /// Description name or path
        name: String,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
    /// Check a description for consistency
    Validate {
        /// Description name or path
        name: String,
    },
    /// Generate a starter description
    Template {
        /// SoC name
        name: String,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("warning: logging disabled: {e}");
    }

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn log_level(verbose: u8, quiet: u8) -> LevelFilter {
    match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-2 => LevelFilter::Off,
        -1 => LevelFilter::Error,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8, quiet: u8) -> Result<(), log::SetLoggerError> {
    SimpleLogger::new()
        .with_level(log_level(verbose, quiet))
        .without_timestamps()
        .init()
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&name),

        Commands::Build {
            build,
            no_execute,
            init,
            emit_soc,
            report,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let args = BuildArgs {
                no_execute,
                init,
                emit_soc,
                report,
                ..build.into_args()
            };
            commands::build::run(&project_dir, manifest.as_ref(), &args)
        }

        Commands::Plan { build, show } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::plan::run(&project_dir, manifest.as_ref(), &build.into_args(), show)
        }

        Commands::Soc { action } => {
            let (_, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            match action {
                SocAction::List => commands::soc::list(&project_dir),
                SocAction::Describe { name, format } => {
                    commands::soc::describe(&project_dir, &name, format.as_deref())
                }
                SocAction::Validate { name } => commands::soc::validate(&project_dir, &name),
                SocAction::Template { name, output } => {
                    commands::soc::template(&name, output.as_deref().map(Path::new))
                }
            }
        }

        Commands::Doctor => {
            let (_, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::doctor::run(&project_dir)
        }

        Commands::Clean { litedram } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let (build_dir, litedram_dir) = build_dirs(manifest.as_ref(), &project_dir);
            commands::clean::run(&build_dir, litedram.then_some(litedram_dir.as_path()))
        }
    }
}

/// Build and LiteDRAM directories, from the manifest or the defaults.
fn build_dirs(manifest: Option<&SocgenManifest>, project_dir: &Path) -> (PathBuf, PathBuf) {
    let build = manifest.map(|m| &m.build);
    let build_dir = build.and_then(|b| b.build_dir.as_deref());
    let litedram_dir = build.and_then(|b| b.litedram_dir.as_deref());
    (
        project_dir.join(build_dir.unwrap_or("build/soc")),
        project_dir.join(litedram_dir.unwrap_or("build/litedram")),
    )
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<SocgenManifest>, Option<PathBuf>)> {
    match SocgenManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
