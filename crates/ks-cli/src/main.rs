//! kskit CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

mod hist;
mod mass_scan;
mod shorten;

#[derive(Parser)]
#[command(name = "kskit")]
#[command(about = "kskit - K_S K_S analysis helpers")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the four invariant-mass histograms from a tree
    Hist {
        /// Input ROOT file
        input: PathBuf,

        /// Tree name. Defaults to the first key in the file.
        #[arg(long)]
        tree: Option<String>,
    },

    /// Copy the first N entries of a tree into a new file
    Shorten {
        /// Input ROOT file
        input: PathBuf,

        /// Number of entries to keep (negative keeps none)
        #[arg(allow_negative_numbers = true)]
        n_events: i64,

        /// Tree name. Defaults to the first key in the file.
        #[arg(long)]
        tree: Option<String>,
    },

    /// Run an external program over a mass grid and plot its output
    MassScan {
        /// Program receiving the squared masses as arguments
        #[arg(long, default_value = "./run_mcmc")]
        executable: PathBuf,

        /// Output SVG
        #[arg(short, long, default_value = "mass_scan.svg")]
        output: PathBuf,

        /// Also write the plot-friendly JSON artifact here
        #[arg(long)]
        artifact: Option<PathBuf>,

        /// YAML file with styling overrides
        #[arg(long)]
        config: Option<PathBuf>,

        /// Open the SVG in the platform viewer when done
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Hist { input, tree } => hist::cmd_hist(&input, tree.as_deref()),
        Commands::Shorten { input, n_events, tree } => {
            shorten::cmd_shorten(&input, n_events, tree.as_deref())
        }
        Commands::MassScan { executable, output, artifact, config, show } => {
            mass_scan::cmd_mass_scan(&mass_scan::ScanArgs {
                executable,
                output,
                artifact,
                config,
                show,
            })
        }
    }
}

/// `<dir>/<stem><suffix>.root` next to `input`.
fn sibling_output(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.file_stem().map(OsStr::to_os_string).unwrap_or_default();
    name.push(suffix);
    name.push(".root");
    input.with_file_name(name)
}

/// Open the tree named `name`, or the first keyed object when `None`.
fn open_tree(file: &ks_root::RootFile, name: Option<&str>) -> ks_root::Result<ks_root::Tree> {
    match name {
        Some(name) => file.get_tree(name),
        None => file.read_first_tree(),
    }
}
