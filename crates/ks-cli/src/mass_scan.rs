//! `kskit mass-scan`: evaluate an external program over a mass grid and plot it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use ks_viz_render::artifact::MassScanArtifact;
use ks_viz_render::config::resolve_config;
use ks_viz_render::render_to_file;

const GRID_START: f64 = 0.5;
const GRID_STOP: f64 = 2.0;
const GRID_POINTS: usize = 500;
const Y_RANGE: [f64; 2] = [0.0, 200.0];

/// Ways the external program can fail us.
#[derive(Debug, Error)]
pub enum MassScanError {
    #[error("failed to start {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} exited with {status}: {stderr}")]
    NonZeroExit { path: String, status: std::process::ExitStatus, stderr: String },
    #[error("line {line}: cannot parse '{text}' as a number")]
    Parse { line: usize, text: String },
    #[error("expected {expected} values, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

pub struct ScanArgs {
    pub executable: PathBuf,
    pub output: PathBuf,
    pub artifact: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub show: bool,
}

/// `n` evenly spaced points over `[start, stop]`; the last one is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Shortest decimal string that parses back to `v` (`0.25`, `4.0`).
fn format_arg(v: f64) -> String {
    format!("{v:?}")
}

/// One value per non-blank line of `stdout`.
pub fn parse_output(stdout: &str, expected: usize) -> Result<Vec<f64>, MassScanError> {
    let mut values = Vec::with_capacity(expected);
    for (i, line) in stdout.lines().enumerate() {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let v = text
            .parse::<f64>()
            .map_err(|_| MassScanError::Parse { line: i + 1, text: text.to_string() })?;
        values.push(v);
    }
    if values.len() != expected {
        return Err(MassScanError::CountMismatch { expected, got: values.len() });
    }
    Ok(values)
}

/// Run `executable` once with every squared mass and collect one value per point.
pub fn run_scan(executable: &Path, mass_squared: &[f64]) -> Result<Vec<f64>, MassScanError> {
    let path = executable.display().to_string();
    tracing::debug!(executable = %path, args = mass_squared.len(), "starting scan program");
    let out = Command::new(executable)
        .args(mass_squared.iter().map(|&m2| format_arg(m2)))
        .output()
        .map_err(|source| MassScanError::Spawn { path: path.clone(), source })?;
    if !out.status.success() {
        return Err(MassScanError::NonZeroExit {
            path,
            status: out.status,
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    parse_output(&String::from_utf8_lossy(&out.stdout), mass_squared.len())
}

pub fn cmd_mass_scan(args: &ScanArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            resolve_config(Some(&yaml))
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => resolve_config(None)?,
    };

    let mass = linspace(GRID_START, GRID_STOP, GRID_POINTS);
    let mut artifact = MassScanArtifact::new(mass, Vec::new(), Some(Y_RANGE));
    artifact.values = run_scan(&args.executable, &artifact.mass_squared)?;

    println!("{}", serde_json::to_string(&artifact.values)?);

    render_to_file(&artifact, &args.output, &config)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(points = artifact.values.len(), output = %args.output.display(), "plot written");

    if let Some(path) = &args.artifact {
        let json = serde_json::to_string_pretty(&artifact)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(output = %path.display(), "artifact written");
    }

    if args.show {
        open_viewer(&args.output);
    }
    Ok(())
}

/// Hand the file to the platform viewer without waiting for it.
fn open_viewer(path: &Path) {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    if let Err(e) = cmd.arg(path).spawn() {
        tracing::warn!(path = %path.display(), error = %e, "could not open viewer");
    }
}
