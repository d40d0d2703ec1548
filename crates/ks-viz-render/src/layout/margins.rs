use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::header::HEADER_SCALE;
use crate::layout::axes::Axis;
use crate::primitives::TextStyle;

/// Rectangular plot area within the canvas.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Compute auto-margins from axis labels and config.
    pub fn auto(
        canvas: &Canvas,
        y_axis: Option<&Axis>,
        x_axis: Option<&Axis>,
        config: &VizConfig,
    ) -> crate::Result<Self> {
        let tick_style = TextStyle { size: config.font.tick_size, ..Default::default() };
        let label_style = TextStyle { size: config.font.label_size, ..Default::default() };

        // Left margin: y-axis tick labels + axis label + padding
        let mut left = 15.0;
        if let Some(y) = y_axis {
            let max_tick_w = y
                .tick_labels
                .iter()
                .map(|l| canvas.measure_text(l, &tick_style).width)
                .fold(0.0_f64, f64::max);
            left += max_tick_w + 8.0;
            if !y.label.is_empty() {
                left += label_style.size + 6.0;
            }
        }

        let mut bottom = 15.0;
        if let Some(x) = x_axis {
            bottom += tick_style.size + 6.0;
            if !x.label.is_empty() {
                bottom += label_style.size + 6.0;
            }
        }

        let top = if config.header.label.is_empty() {
            12.0
        } else {
            config.font.label_size * HEADER_SCALE + 20.0
        };
        let right = 15.0;

        let width = canvas.width - left - right;
        let height = canvas.height - top - bottom;
        if width < 50.0 || height < 50.0 {
            return Err(crate::RenderError::Layout(format!(
                "figure {}x{} leaves no room for the plot area",
                canvas.width, canvas.height
            )));
        }
        Ok(Self { left, top, width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_takes_top_space() {
        let canvas = Canvas::new(500.0, 300.0).unwrap();
        let x = Axis::clamped(0.5, 2.0, 6).with_label("m");
        let y = Axis::clamped(0.0, 200.0, 6).with_label("value");

        let mut config = VizConfig::default();
        let bare = PlotArea::auto(&canvas, Some(&y), Some(&x), &config).unwrap();
        config.header.label = "KSKS".into();
        let headed = PlotArea::auto(&canvas, Some(&y), Some(&x), &config).unwrap();

        assert!(headed.top > bare.top);
        assert_eq!(headed.bottom(), bare.bottom());
        assert!(bare.left > 15.0);
        assert!(bare.right() <= canvas.width);
    }

    #[test]
    fn tiny_figure_is_a_layout_error() {
        let canvas = Canvas::new(60.0, 40.0).unwrap();
        let err = PlotArea::auto(&canvas, None, None, &VizConfig::default()).unwrap_err();
        assert!(matches!(err, crate::RenderError::Layout(_)));
    }
}
