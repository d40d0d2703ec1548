use std::fmt::Write as FmtWrite;

use crate::primitives::*;
use crate::text::{TextMetrics, measure_text};

/// Font stack used for every text element.
const FONT_FAMILY: &str = "Inter, Helvetica, Arial, sans-serif";

/// An SVG element stored for deferred rendering.
#[derive(Debug, Clone)]
enum SvgElement {
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        style: LineStyle,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        style: LineStyle,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        style: TextStyle,
        rotate: Option<f64>,
    },
    Group {
        clip_id: String,
        children: Vec<SvgElement>,
    },
}

/// Immediate-mode SVG canvas. Coordinates in points (1pt = 1/72").
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    elements: Vec<SvgElement>,
    defs: Vec<String>,
    clip_stack: Vec<String>,
    next_clip_id: usize,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> crate::Result<Self> {
        if !(width > 0.0 && height > 0.0) {
            return Err(crate::RenderError::Layout(format!(
                "figure size must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            elements: Vec::new(),
            defs: Vec::new(),
            clip_stack: Vec::new(),
            next_clip_id: 0,
        })
    }

    // --- Drawing primitives ---

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        self.push(SvgElement::Line { x1, y1, x2, y2, style: *style });
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], style: &LineStyle) {
        self.push(SvgElement::Polyline { points: points.to_vec(), style: *style });
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        self.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            style: *style,
            rotate: None,
        });
    }

    pub fn text_rotated(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, angle: f64) {
        self.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            style: *style,
            rotate: Some(angle),
        });
    }

    // --- Clip paths ---

    /// Clip everything drawn until the matching [`pop_clip`](Self::pop_clip)
    /// to the given rectangle. Clips do not nest.
    pub fn push_clip(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("clip{}", self.next_clip_id);
        self.next_clip_id += 1;
        self.defs.push(format!(
            r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" /></clipPath>"#
        ));
        self.elements.push(SvgElement::Group { clip_id: id.clone(), children: Vec::new() });
        self.clip_stack.push(id.clone());
        id
    }

    pub fn pop_clip(&mut self) {
        self.clip_stack.pop();
    }

    // --- Text measurement ---

    pub fn measure_text(&self, content: &str, style: &TextStyle) -> TextMetrics {
        measure_text(content, style)
    }

    // --- SVG output ---

    fn push(&mut self, elem: SvgElement) {
        if let Some(id) = self.clip_stack.last() {
            if let Some(SvgElement::Group { clip_id, children }) = self.elements.last_mut() {
                if clip_id == id {
                    children.push(elem);
                    return;
                }
            }
        }
        self.elements.push(elem);
    }

    pub fn finish_svg(&self) -> crate::Result<String> {
        let mut out = String::with_capacity(32 * 1024);
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        )?;

        // Defs (clip paths)
        if !self.defs.is_empty() {
            out.push_str("<defs>\n");
            for d in &self.defs {
                out.push_str(d);
                out.push('\n');
            }
            out.push_str("</defs>\n");
        }

        // Background (white)
        writeln!(out, r#"<rect width="{}" height="{}" fill="white" />"#, self.width, self.height)?;

        for elem in &self.elements {
            render_element(&mut out, elem)?;
        }

        out.push_str("</svg>\n");
        Ok(out)
    }
}

fn render_element(out: &mut String, elem: &SvgElement) -> std::fmt::Result {
    match elem {
        SvgElement::Line { x1, y1, x2, y2, style } => {
            write!(out, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#)?;
            write_line_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Polyline { points, style } => {
            out.push_str(r#"<polyline points=""#);
            for (i, (x, y)) in points.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write!(out, "{x:.2},{y:.2}")?;
            }
            out.push_str(r#"" fill="none""#);
            write_line_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Text { x, y, content, style, rotate } => {
            write!(out, r#"<text x="{x:.2}" y="{y:.2}""#)?;
            write!(out, r#" font-family="{FONT_FAMILY}" font-size="{:.1}""#, style.size)?;
            write!(out, r#" fill="{}""#, style.color.svg_paint())?;
            write!(out, r#" text-anchor="{}""#, style.anchor.svg_value())?;
            write!(out, r#" dominant-baseline="{}""#, style.baseline.svg_value())?;
            if style.bold {
                out.push_str(r#" font-weight="bold""#);
            }
            if style.italic {
                out.push_str(r#" font-style="italic""#);
            }
            if let Some(angle) = rotate {
                write!(out, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#)?;
            }
            out.push('>');
            for ch in content.chars() {
                match ch {
                    '<' => out.push_str("&lt;"),
                    '>' => out.push_str("&gt;"),
                    '&' => out.push_str("&amp;"),
                    '"' => out.push_str("&quot;"),
                    _ => out.push(ch),
                }
            }
            out.push_str("</text>\n");
        }
        SvgElement::Group { clip_id, children } => {
            writeln!(out, r#"<g clip-path="url(#{clip_id})">"#)?;
            for child in children {
                render_element(out, child)?;
            }
            out.push_str("</g>\n");
        }
    }
    Ok(())
}

fn write_line_attrs(out: &mut String, style: &LineStyle) -> std::fmt::Result {
    write!(out, r#" stroke="{}""#, style.color.svg_paint())?;
    write!(out, r#" stroke-width="{:.2}""#, style.width)?;
    if let Some((on, off)) = style.dash {
        write!(out, r#" stroke-dasharray="{on} {off}""#)?;
    }
    Ok(())
}
