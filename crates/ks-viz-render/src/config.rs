use serde::Deserialize;

use crate::color::Color;

/// Top-level visualization configuration (YAML or programmatic).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub figure: FigureConfig,
    pub font: FontConfig,
    pub axes: AxesConfig,
    pub grid: GridConfig,
    pub header: HeaderConfig,
    pub colors: ColorsConfig,
    pub line: LineConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 518.4,  // 7.2" * 72
            height: 345.6, // 4.8" * 72
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub size: f64,
    pub label_size: f64,
    pub tick_size: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { size: 10.0, label_size: 11.0, tick_size: 8.5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    /// `"in"` or `"out"`.
    pub tick_direction: String,
    pub show_top_ticks: bool,
    pub show_right_ticks: bool,
    pub tick_length: f64,
    pub minor_tick_length: f64,
    /// Target number of major ticks per axis.
    pub target_ticks: usize,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_direction: "in".into(),
            show_top_ticks: true,
            show_right_ticks: true,
            tick_length: 5.0,
            minor_tick_length: 3.0,
            target_ticks: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub show: bool,
    pub color: Color,
    pub alpha: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { show: true, color: Color::hex("#CBD5E1"), alpha: 0.55 }
    }
}

/// Header above the plot area: a bold label followed by an italic status.
/// An empty label hides the header and shrinks the top margin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub label: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub line: Color,
    pub frame: Color,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            line: Color::hex("#1D4ED8"),
            frame: Color::hex("#000000"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub width: f64,
    pub dashed: bool,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self { width: 1.5, dashed: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: "svg".into() }
    }
}

/// Resolve a VizConfig from optional YAML string.
/// Keys missing from the YAML keep their defaults.
pub fn resolve_config(user_yaml: Option<&str>) -> crate::Result<VizConfig> {
    match user_yaml {
        None => Ok(VizConfig::default()),
        Some(yaml) if yaml.trim().is_empty() => Ok(VizConfig::default()),
        Some(yaml) => {
            let config: VizConfig = serde_yaml_ng::from_str(yaml)
                .map_err(|e| crate::RenderError::Config(e.to_string()))?;
            Ok(config)
        }
    }
}
