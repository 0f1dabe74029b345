//! Reshaping of plot payloads into named series of points.

use serde::Deserialize;

use crate::core::types::{PlotSeries, Series};

/// Name of the knee-plot trace holding the called cells
pub const KNEE_CURVE_NAME: &str = "Cells";

/// A single trace of a plot payload with parallel x/y arrays
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Curve {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub x: Vec<f64>,
    #[serde(default)]
    pub y: Vec<f64>,
}

/// Zip a curve's x/y arrays into points, keeping the source order.
///
/// Extra values in the longer array are dropped.
#[must_use]
pub fn xy_series(curve: &Curve) -> Series {
    curve.x.iter().copied().zip(curve.y.iter().copied()).collect()
}

/// Re-key the cell trace of a barcode-rank plot under `sample`.
///
/// The trace named [`KNEE_CURVE_NAME`] is used, or the first trace when none
/// carries that name. Points keep the payload order (rank-descending as
/// written by the pipeline); nothing is re-sorted.
#[must_use]
pub fn knee_series(curves: &[Curve], sample: &str) -> PlotSeries {
    let curve = curves
        .iter()
        .find(|c| c.name.as_deref() == Some(KNEE_CURVE_NAME))
        .or_else(|| curves.first());

    let mut series = PlotSeries::new();
    if let Some(curve) = curve {
        series.insert(sample.to_string(), xy_series(curve));
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(name: &str, x: &[f64], y: &[f64]) -> Curve {
        Curve {
            name: Some(name.to_string()),
            x: x.to_vec(),
            y: y.to_vec(),
        }
    }

    #[test]
    fn test_xy_series_zips_in_order() {
        let c = curve("genes", &[3.0, 1.0, 2.0], &[30.0, 10.0, 20.0]);
        assert_eq!(xy_series(&c), vec![(3.0, 30.0), (1.0, 10.0), (2.0, 20.0)]);
    }

    #[test]
    fn test_xy_series_uneven_lengths() {
        let c = curve("genes", &[1.0, 2.0, 3.0], &[10.0]);
        assert_eq!(xy_series(&c), vec![(1.0, 10.0)]);
    }

    #[test]
    fn test_knee_series_picks_cells_curve_and_keeps_order() {
        let curves = vec![
            curve("Background", &[1.0], &[1.0]),
            curve("Cells", &[1.0, 10.0, 5.0], &[5000.0, 100.0, 900.0]),
        ];

        let series = knee_series(&curves, "pbmc");
        assert_eq!(series.len(), 1);
        assert_eq!(
            series["pbmc"],
            vec![(1.0, 5000.0), (10.0, 100.0), (5.0, 900.0)]
        );
    }

    #[test]
    fn test_knee_series_falls_back_to_first_curve() {
        let curves = vec![curve("trace0", &[1.0, 2.0], &[9.0, 8.0])];
        let series = knee_series(&curves, "s1");
        assert_eq!(series["s1"], vec![(1.0, 9.0), (2.0, 8.0)]);
    }

    #[test]
    fn test_knee_series_empty_payload() {
        assert!(knee_series(&[], "s1").is_empty());
    }
}
