/// Axis configuration with tick generation and data→pixel mapping.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub minor_ticks: Vec<f64>,
}

impl Axis {
    /// Auto-scale linear axis with "nice number" ticks; limits snap outward
    /// to the tick grid.
    pub fn auto_linear(data_min: f64, data_max: f64, target_ticks: usize) -> Self {
        let (nice_min, nice_max, step) = nice_range(data_min, data_max, target_ticks);
        Self::with_ticks(nice_min, nice_max, step)
    }

    /// Linear axis over exactly `[min, max]` with nice ticks inside it.
    pub fn clamped(min: f64, max: f64, target_ticks: usize) -> Self {
        if !(max > min) {
            return Self::auto_linear(min, max, target_ticks);
        }
        let step = nice_step((max - min) / (target_ticks.max(2) - 1) as f64);
        Self::with_ticks(min, max, step)
    }

    fn with_ticks(min: f64, max: f64, step: f64) -> Self {
        let ticks = ticks_between(min, max, step);
        let labels = ticks.iter().map(|&v| format_tick(v, step)).collect();

        // Minor ticks: 5 subdivisions per major
        let minor_step = step / 5.0;
        let minor = ticks_between(min, max, minor_step)
            .into_iter()
            .filter(|mv| !ticks.iter().any(|t| (t - mv).abs() < minor_step * 0.01))
            .collect();

        Self {
            min,
            max,
            label: String::new(),
            tick_positions: ticks,
            tick_labels: labels,
            minor_ticks: minor,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Map a data value to pixel coordinate.
    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (value - self.min) / (self.max - self.min);
        px_min + frac * (px_max - px_min)
    }

    /// Map pixel coordinate to data value (inverse).
    pub fn pixel_to_data(&self, px: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (px - px_min) / (px_max - px_min);
        self.min + frac * (self.max - self.min)
    }
}

/// Multiples of `step` inside `[lo, hi]`, computed by index to avoid drift.
fn ticks_between(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    let tol = step * 0.01;
    let first = ((lo - tol) / step).ceil() as i64;
    let last = ((hi + tol) / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// "Nice numbers" algorithm for pleasant tick spacing.
fn nice_range(data_min: f64, data_max: f64, target_ticks: usize) -> (f64, f64, f64) {
    if (data_max - data_min).abs() < 1e-15 {
        return (data_min - 1.0, data_max + 1.0, 1.0);
    }
    let range = data_max - data_min;
    let rough_step = range / (target_ticks.max(2) - 1) as f64;
    let step = nice_step(rough_step);
    let nice_min = (data_min / step).floor() * step;
    let nice_max = (data_max / step).ceil() * step;
    (nice_min, nice_max, step)
}

fn nice_step(rough: f64) -> f64 {
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice_frac = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice_frac * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };
    if decimals == 0 {
        // Avoid "-0"
        let v = if value.abs() < step * 0.01 { 0.0 } else { value };
        format!("{}", v.round() as i64)
    } else {
        format!("{:.prec$}", value, prec = decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn auto_linear_basic() {
        let ax = Axis::auto_linear(0.0, 10.0, 6);
        assert!(!ax.tick_positions.is_empty());
        assert!(ax.min <= 0.0);
        assert!(ax.max >= 10.0);
    }

    #[test]
    fn data_to_pixel_linear() {
        let ax = Axis::auto_linear(0.0, 100.0, 5);
        let px = ax.data_to_pixel(50.0, 0.0, 500.0);
        assert!((px - 250.0).abs() < 1.0);
        assert_relative_eq!(ax.pixel_to_data(px, 0.0, 500.0), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn clamped_keeps_limits() {
        let y = Axis::clamped(0.0, 200.0, 6);
        assert_eq!((y.min, y.max), (0.0, 200.0));
        assert_eq!(y.tick_labels, ["0", "50", "100", "150", "200"]);

        let x = Axis::clamped(0.5, 2.0, 6);
        assert_eq!((x.min, x.max), (0.5, 2.0));
        assert_eq!(x.tick_labels.first().map(String::as_str), Some("0.6"));
        assert_eq!(x.tick_labels.last().map(String::as_str), Some("2.0"));
        assert!(x.tick_positions.iter().all(|&t| (0.5..=2.0).contains(&t)));
    }

    #[test]
    fn degenerate_range_still_has_ticks() {
        let ax = Axis::clamped(3.0, 3.0, 6);
        assert!(ax.max > ax.min);
        assert!(!ax.tick_positions.is_empty());
    }

    #[test]
    fn nice_step_values() {
        assert!((nice_step(3.2) - 2.0).abs() < 1e-9);
        assert!((nice_step(0.7) - 0.5).abs() < 1e-9);
        assert!((nice_step(15.0) - 10.0).abs() < 1e-9);
        assert!((nice_step(4.5) - 5.0).abs() < 1e-9);
        assert!((nice_step(1.2) - 1.0).abs() < 1e-9);
    }
}
