use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Gap between a tick label and the frame (or the tick tip for outward ticks).
const LABEL_GAP: f64 = 3.0;

#[derive(Clone, Copy, PartialEq)]
enum Edge {
    Bottom,
    Top,
    Left,
    Right,
}

/// Tick geometry shared by all four edges.
struct Ticks<'a> {
    area: &'a PlotArea,
    inward: bool,
}

impl Ticks<'_> {
    /// Frame coordinate of `edge`, and the sign pointing into the plot area.
    fn edge(&self, edge: Edge) -> (f64, f64) {
        match edge {
            Edge::Bottom => (self.area.bottom(), -1.0),
            Edge::Top => (self.area.top, 1.0),
            Edge::Left => (self.area.left, 1.0),
            Edge::Right => (self.area.right(), -1.0),
        }
    }

    fn draw(&self, canvas: &mut Canvas, edge: Edge, at: f64, len: f64, style: &LineStyle) {
        let (base, inside) = self.edge(edge);
        let tip = if self.inward { base + inside * len } else { base - inside * len };
        match edge {
            Edge::Bottom | Edge::Top => canvas.line(at, base, at, tip, style),
            Edge::Left | Edge::Right => canvas.line(base, at, tip, at, style),
        }
    }

    /// Distance from the frame to where tick labels start.
    fn label_offset(&self, tick_len: f64) -> f64 {
        if self.inward { LABEL_GAP } else { tick_len + LABEL_GAP }
    }
}

/// Pixel positions of `values` that fall inside `[lo, hi]` (half-point slack).
fn visible(values: &[f64], map: impl Fn(f64) -> f64, lo: f64, hi: f64) -> Vec<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i, map(v)))
        .filter(|&(_, px)| px >= lo - 0.5 && px <= hi + 0.5)
        .collect()
}

/// Draw the box frame with ticks, dashed grid, tick labels and axis labels.
pub fn draw_axes(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    config: &VizConfig,
) {
    let color = config.colors.frame;
    let major = LineStyle::solid(color, 0.6);
    let minor = LineStyle::solid(color, 0.4);
    let grid =
        LineStyle::solid(config.grid.color.with_alpha(config.grid.alpha), 0.5).with_dash(3.0, 3.0);
    let tl = config.axes.tick_length;
    let mtl = config.axes.minor_tick_length;
    let ticks = Ticks { area, inward: config.axes.tick_direction == "in" };

    let frame = LineStyle::solid(color, 0.8);
    let (l, r, t, b) = (area.left, area.right(), area.top, area.bottom());
    for (x1, y1, x2, y2) in [(l, t, r, t), (l, b, r, b), (l, t, l, b), (r, t, r, b)] {
        canvas.line(x1, y1, x2, y2, &frame);
    }

    let x_px = |v| x_axis.data_to_pixel(v, l, r);
    let y_px = |v| y_axis.data_to_pixel(v, b, t);

    let x_label_style = TextStyle {
        size: config.font.tick_size,
        color,
        anchor: TextAnchor::Middle,
        baseline: TextBaseline::Hanging,
        ..Default::default()
    };
    for (i, px) in visible(&x_axis.tick_positions, x_px, l, r) {
        if config.grid.show {
            canvas.line(px, t, px, b, &grid);
        }
        ticks.draw(canvas, Edge::Bottom, px, tl, &major);
        if config.axes.show_top_ticks {
            ticks.draw(canvas, Edge::Top, px, tl, &major);
        }
        if let Some(label) = x_axis.tick_labels.get(i) {
            canvas.text(px, b + ticks.label_offset(tl), label, &x_label_style);
        }
    }
    for (_, px) in visible(&x_axis.minor_ticks, x_px, l, r) {
        ticks.draw(canvas, Edge::Bottom, px, mtl, &minor);
    }

    let y_label_style = TextStyle {
        size: config.font.tick_size,
        color,
        anchor: TextAnchor::End,
        baseline: TextBaseline::Central,
        ..Default::default()
    };
    for (i, py) in visible(&y_axis.tick_positions, y_px, t, b) {
        if config.grid.show {
            canvas.line(l, py, r, py, &grid);
        }
        ticks.draw(canvas, Edge::Left, py, tl, &major);
        if config.axes.show_right_ticks {
            ticks.draw(canvas, Edge::Right, py, tl, &major);
        }
        if let Some(label) = y_axis.tick_labels.get(i) {
            canvas.text(l - ticks.label_offset(tl) - 1.0, py, label, &y_label_style);
        }
    }
    for (_, py) in visible(&y_axis.minor_ticks, y_px, t, b) {
        ticks.draw(canvas, Edge::Left, py, mtl, &minor);
    }

    let title_style = TextStyle {
        size: config.font.label_size,
        color,
        anchor: TextAnchor::Middle,
        ..Default::default()
    };
    if !x_axis.label.is_empty() {
        let y = b + ticks.label_offset(tl) + config.font.tick_size + 11.0;
        canvas.text(l + area.width / 2.0, y, &x_axis.label, &title_style);
    }
    if !y_axis.label.is_empty() {
        let x = l - 8.0 - y_tick_label_width(canvas, y_axis, config) - config.font.label_size;
        canvas.text_rotated(x, t + area.height / 2.0, &y_axis.label, &title_style, -90.0);
    }
}

fn y_tick_label_width(canvas: &Canvas, y_axis: &Axis, config: &VizConfig) -> f64 {
    let style = TextStyle { size: config.font.tick_size, ..Default::default() };
    y_axis.tick_labels.iter().map(|l| canvas.measure_text(l, &style).width).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> PlotArea {
        PlotArea { left: 50.0, top: 20.0, width: 400.0, height: 200.0 }
    }

    #[test]
    fn ticks_point_inward_or_outward() {
        let a = area();
        let inward = Ticks { area: &a, inward: true };
        let outward = Ticks { area: &a, inward: false };
        let mut c = Canvas::new(500.0, 300.0).unwrap();
        inward.draw(&mut c, Edge::Bottom, 100.0, 5.0, &LineStyle::default());
        outward.draw(&mut c, Edge::Left, 100.0, 5.0, &LineStyle::default());
        let svg = c.finish_svg().unwrap();
        assert!(svg.contains(r#"x1="100.00" y1="220.00" x2="100.00" y2="215.00""#));
        assert!(svg.contains(r#"x1="50.00" y1="100.00" x2="45.00" y2="100.00""#));
    }

    #[test]
    fn out_of_area_ticks_are_dropped() {
        let v = visible(&[0.0, 1.0, 2.0, 3.0], |v| v * 100.0, 50.0, 250.0);
        assert_eq!(v, [(1, 100.0), (2, 200.0)]);
    }

    #[test]
    fn grid_follows_config() {
        let x = Axis::clamped(0.5, 2.0, 6);
        let y = Axis::clamped(0.0, 200.0, 6);
        let mut config = VizConfig::default();

        let mut c = Canvas::new(500.0, 300.0).unwrap();
        draw_axes(&mut c, &area(), &x, &y, &config);
        assert!(c.finish_svg().unwrap().contains(r#"stroke-dasharray="3 3""#));

        config.grid.show = false;
        let mut c = Canvas::new(500.0, 300.0).unwrap();
        draw_axes(&mut c, &area(), &x, &y, &config);
        assert!(!c.finish_svg().unwrap().contains("stroke-dasharray"));
    }
}
