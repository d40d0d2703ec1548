use serde::{Deserialize, Serialize};

/// Result of a mass scan: one value per grid point, plus plot hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassScanArtifact {
    /// Grid of masses (x).
    pub mass: Vec<f64>,
    /// Squares of the grid points, as passed to the external program.
    pub mass_squared: Vec<f64>,
    /// Value returned for each grid point (y).
    pub values: Vec<f64>,
    /// Visible y range; points outside it are clipped.
    #[serde(default)]
    pub y_range: Option<[f64; 2]>,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
}

fn default_x_label() -> String {
    "m (GeV/c\u{00B2})".into()
}

fn default_y_label() -> String {
    "value".into()
}

impl MassScanArtifact {
    /// Build from a grid and its values with default labels.
    pub fn new(mass: Vec<f64>, values: Vec<f64>, y_range: Option<[f64; 2]>) -> Self {
        let mass_squared = mass.iter().map(|m| m * m).collect();
        Self {
            mass,
            mass_squared,
            values,
            y_range,
            x_label: default_x_label(),
            y_label: default_y_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_default_when_missing() {
        let art: MassScanArtifact = serde_json::from_str(
            r#"{"mass": [1.0], "mass_squared": [1.0], "values": [3.5], "y_range": [0, 200]}"#,
        )
        .unwrap();
        assert_eq!(art.y_range, Some([0.0, 200.0]));
        assert_eq!(art.y_label, "value");
        assert!(art.x_label.starts_with("m "));
    }

    #[test]
    fn new_squares_the_grid() {
        let art = MassScanArtifact::new(vec![0.5, 2.0], vec![1.0, 2.0], None);
        assert_eq!(art.mass_squared, vec![0.25, 4.0]);
        let json = serde_json::to_value(&art).unwrap();
        assert!(json["y_range"].is_null());
    }
}
