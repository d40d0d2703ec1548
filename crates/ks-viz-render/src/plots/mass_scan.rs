use crate::artifact::MassScanArtifact;
use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::header::draw_header;
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::plots::axes_draw::draw_axes;
use crate::primitives::*;

/// Line plot of scan value vs. mass. Non-finite values break the line.
pub fn render(artifact: &MassScanArtifact, config: &VizConfig) -> crate::Result<String> {
    if artifact.mass.len() != artifact.values.len() {
        return Err(crate::RenderError::Layout(format!(
            "{} mass points but {} values",
            artifact.mass.len(),
            artifact.values.len()
        )));
    }
    if artifact.mass.is_empty() {
        return Ok(empty_svg());
    }

    let mut canvas = Canvas::new(config.figure.width, config.figure.height)?;
    let ticks = config.axes.target_ticks;

    let (x_min, x_max) = finite_bounds(&artifact.mass).unwrap_or((0.0, 1.0));
    let x_axis = Axis::clamped(x_min, x_max, ticks).with_label(&artifact.x_label);
    let y_axis = match artifact.y_range {
        Some([lo, hi]) => Axis::clamped(lo, hi, ticks),
        None => {
            let (lo, hi) = finite_bounds(&artifact.values).unwrap_or((0.0, 1.0));
            Axis::auto_linear(lo, hi, ticks)
        }
    }
    .with_label(&artifact.y_label);

    let area = PlotArea::auto(&canvas, Some(&y_axis), Some(&x_axis), config)?;
    draw_header(&mut canvas, &area, config);
    draw_axes(&mut canvas, &area, &x_axis, &y_axis, config);

    let style = if config.line.dashed {
        LineStyle::dashed(config.colors.line, config.line.width)
    } else {
        LineStyle::solid(config.colors.line, config.line.width)
    };

    canvas.push_clip(area.left, area.top, area.width, area.height);
    let mut segment: Vec<(f64, f64)> = Vec::new();
    for (&m, &v) in artifact.mass.iter().zip(&artifact.values) {
        if m.is_finite() && v.is_finite() {
            segment.push((
                x_axis.data_to_pixel(m, area.left, area.right()),
                y_axis.data_to_pixel(v, area.bottom(), area.top),
            ));
        } else if !segment.is_empty() {
            canvas.polyline(&segment, &style);
            segment.clear();
        }
    }
    if !segment.is_empty() {
        canvas.polyline(&segment, &style);
    }
    canvas.pop_clip();

    canvas.finish_svg()
}

fn finite_bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn empty_svg() -> String {
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><text x="10" y="30">No scan data</text></svg>"#.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(values: Vec<f64>) -> MassScanArtifact {
        let n = values.len();
        let mass = (0..n).map(|i| 0.5 + 1.5 * i as f64 / (n - 1) as f64).collect();
        MassScanArtifact::new(mass, values, Some([0.0, 200.0]))
    }

    #[test]
    fn renders_one_polyline_with_all_points() {
        let art = scan((0..50).map(|i| i as f64 * 3.0).collect());
        let svg = render(&art, &VizConfig::default()).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 1);
        let points = svg.split(r#"points=""#).nth(1).unwrap().split('"').next().unwrap();
        assert_eq!(points.split(' ').count(), 50);
        assert!(svg.contains("clip-path"));
        assert!(svg.contains(">200</text>"));
        assert!(svg.contains("m (GeV/c²)"));
    }

    #[test]
    fn non_finite_values_split_the_line() {
        let mut values: Vec<f64> = (0..10).map(f64::from).collect();
        values[4] = f64::NAN;
        let svg = render(&scan(values), &VizConfig::default()).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn header_is_drawn_when_configured() {
        let mut config = VizConfig::default();
        config.header.label = "KSKS".into();
        config.header.status = "Preliminary".into();
        let svg = render(&scan(vec![1.0, 2.0, 3.0]), &config).unwrap();
        assert!(svg.contains(r#"font-weight="bold">KSKS</text>"#));
        assert!(svg.contains(r#"font-style="italic">Preliminary</text>"#));
    }

    #[test]
    fn length_mismatch_is_a_layout_error() {
        let mut art = scan(vec![1.0, 2.0, 3.0]);
        art.values.pop();
        assert!(matches!(render(&art, &VizConfig::default()), Err(crate::RenderError::Layout(_))));
    }

    #[test]
    fn empty_scan_gives_placeholder() {
        let art = MassScanArtifact::new(Vec::new(), Vec::new(), None);
        let svg = render(&art, &VizConfig::default()).unwrap();
        assert!(svg.contains("No scan data"));
    }
}
