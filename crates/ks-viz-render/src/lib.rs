//! SVG rendering of scan artifacts.
//!
//! Artifacts are drawn into an in-memory [`canvas::Canvas`]
//! styled by a [`config::VizConfig`].

pub mod artifact;
pub mod canvas;
pub mod color;
pub mod config;
pub mod header;
pub mod layout;
pub mod output;
pub mod plots;
pub mod primitives;
pub mod text;

use std::path::Path;

use artifact::MassScanArtifact;
use config::VizConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::fmt::Error> for RenderError {
    fn from(e: std::fmt::Error) -> Self {
        RenderError::Layout(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render a mass scan in `config.output.format` and write it to `path`.
pub fn render_to_file(artifact: &MassScanArtifact, path: &Path, config: &VizConfig) -> Result<()> {
    match config.output.format.as_str() {
        "svg" => output::svg::save_svg(&plots::mass_scan::render(artifact, config)?, path),
        other => Err(RenderError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan() -> MassScanArtifact {
        MassScanArtifact::new(vec![0.5, 1.0, 2.0], vec![1.0, 2.0, 3.0], Some([0.0, 200.0]))
    }

    #[test]
    fn writes_svg_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/scan.svg");
        render_to_file(&scan(), &path, &VizConfig::default()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("<svg"));
    }

    #[test]
    fn other_formats_are_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        let config = config::resolve_config(Some("output:\n  format: png\n")).unwrap();
        let err = render_to_file(&scan(), &path, &config).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat(ref f) if f == "png"));
        assert!(!path.exists());
    }
}
