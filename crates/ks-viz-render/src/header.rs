use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Font size of the header label relative to axis labels.
pub(crate) const HEADER_SCALE: f64 = 1.3;

/// Draw the header label (e.g. **KSKS** *Preliminary*) above the plot area.
pub fn draw_header(canvas: &mut Canvas, area: &PlotArea, config: &VizConfig) {
    if config.header.label.is_empty() {
        return;
    }

    let header_size = config.font.label_size * HEADER_SCALE;
    let x = area.left + area.width * 0.02;
    let y = area.top - 6.0;

    let bold_style = TextStyle {
        size: header_size,
        color: config.colors.frame,
        bold: true,
        ..Default::default()
    };
    canvas.text(x, y, &config.header.label, &bold_style);

    if !config.header.status.is_empty() {
        let name_w = canvas.measure_text(&config.header.label, &bold_style).width;
        let italic_style = TextStyle {
            size: header_size * 0.85,
            color: config.colors.frame,
            italic: true,
            ..Default::default()
        };
        canvas.text(x + name_w + 5.0, y, &config.header.status, &italic_style);
    }
}
