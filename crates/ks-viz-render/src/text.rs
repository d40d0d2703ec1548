use crate::primitives::TextStyle;

/// Average advance of a glyph relative to the font size.
const AVG_ADVANCE: f64 = 0.55;
/// Extra width of bold glyphs.
const BOLD_FACTOR: f64 = 1.08;

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

/// Estimate text extent in points from character count and style.
///
/// No font is embedded, so the viewer picks the face; the estimate only
/// has to be good enough for margins and label placement.
pub fn measure_text(text: &str, style: &TextStyle) -> TextMetrics {
    let mut width = text.chars().count() as f64 * style.size * AVG_ADVANCE;
    if style.bold {
        width *= BOLD_FACTOR;
    }
    TextMetrics { width, height: style.size * 1.2, ascent: style.size * 0.93 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn measure_hello() {
        let m = measure_text("Hello", &TextStyle { size: 12.0, ..Default::default() });
        assert_relative_eq!(m.width, 33.0);
        assert!(m.height > 8.0);
        assert!(m.ascent > 0.0);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let style = TextStyle::default();
        assert_eq!(measure_text("m²", &style).width, measure_text("mm", &style).width);
    }

    #[test]
    fn bold_wider_than_regular() {
        let regular = TextStyle::default();
        let bold = TextStyle { bold: true, ..Default::default() };
        assert!(measure_text("Test", &bold).width > measure_text("Test", &regular).width);
    }
}
