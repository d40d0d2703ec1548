//! Stroke and text styles carried by canvas elements.

use crate::color::Color;

/// Stroke of a line or polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    /// Dash and gap lengths in points; `None` strokes solid.
    pub dash: Option<(f64, f64)>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::solid(Color::BLACK, 1.0)
    }
}

impl LineStyle {
    pub const fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: None }
    }

    pub const fn dashed(color: Color, width: f64) -> Self {
        Self::solid(color, width).with_dash(6.0, 3.0)
    }

    pub const fn with_dash(mut self, on: f64, off: f64) -> Self {
        self.dash = Some((on, off));
        self
    }
}

/// Font and placement of one text element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub anchor: TextAnchor,
    pub baseline: TextBaseline,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 10.0,
            color: Color::BLACK,
            bold: false,
            italic: false,
            anchor: TextAnchor::default(),
            baseline: TextBaseline::default(),
        }
    }
}

/// Horizontal alignment against the text's x coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl TextAnchor {
    /// Value of the SVG `text-anchor` attribute.
    pub const fn svg_value(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// Vertical alignment against the text's y coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    #[default]
    Alphabetic,
    Central,
    Hanging,
}

impl TextBaseline {
    /// Value of the SVG `dominant-baseline` attribute.
    pub const fn svg_value(self) -> &'static str {
        match self {
            TextBaseline::Alphabetic => "auto",
            TextBaseline::Central => "central",
            TextBaseline::Hanging => "hanging",
        }
    }
}
