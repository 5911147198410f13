//! Incremental N-dimensional cubic Bézier curve fitting.
//!
//! Given an ordered polyline of runtime-dimensioned samples and a squared
//! error tolerance, [`fit_incremental`] produces a shorter sequence of cubic
//! Bézier knots approximating it within that tolerance, optionally
//! preserving sharp corners as non-smooth knots.

pub mod driver;
pub mod error;
pub mod fit_single;
pub mod heap;
pub mod knot;
pub mod passes;
pub mod vector;

pub use driver::{fit_incremental, fit_incremental_f32, FitConfig, FitOutput};
pub use error::FitError;

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().filter_level(log::LevelFilter::Debug).try_init();
    }

    fn flatten(points: &[[f64; 2]]) -> Vec<f64> {
        points.iter().flat_map(|p| p.iter().copied()).collect()
    }

    #[test]
    fn straight_line_collapses_to_one_segment() {
        init_logger();

        let points: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, 0.0]).collect();
        let flat = flatten(&points);

        let out = fit_incremental(&flat, points.len() as u32, 2, &FitConfig::default()).unwrap();

        assert_eq!(out.cubics.len(), 2);
        assert_eq!(out.orig_index[0], 0);
        assert_eq!(*out.orig_index.last().unwrap(), points.len() as u32 - 1);
    }

    #[test]
    fn endpoints_are_always_preserved() {
        let points: Vec<[f64; 3]> = (0..15)
            .map(|i| {
                let t = i as f64 * 0.3;
                [t.sin(), t.cos(), t * 0.1]
            })
            .collect();
        let flat: Vec<f64> = points.iter().flat_map(|p| p.iter().copied()).collect();

        let out = fit_incremental(&flat, points.len() as u32, 3, &FitConfig::default()).unwrap();

        assert_eq!(out.orig_index[0], 0);
        assert_eq!(*out.orig_index.last().unwrap(), points.len() as u32 - 1);
        assert_eq!(*out.corner_index.first().unwrap(), 0);
        assert_eq!(*out.corner_index.last().unwrap(), out.cubics.len() as u32 - 1);
    }

    #[test]
    fn sharp_corner_is_preserved_when_corner_detect_enabled() {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push([i as f64, 0.0]);
        }
        for i in 1..10 {
            points.push([9.0, i as f64]);
        }
        let flat = flatten(&points);

        let config = FitConfig {
            use_corner_detect: true,
            corner_angle: 45.0_f64.to_radians(),
            ..FitConfig::default()
        };

        let out = fit_incremental(&flat, points.len() as u32, 2, &config).unwrap();

        // The knee at (9, 0) must survive as a corner, not get smoothed away.
        let knee_orig_index = 9u32;
        let knee_output_pos = out.orig_index.iter().position(|&i| i == knee_orig_index).unwrap();
        assert!(out.corner_index.contains(&(knee_output_pos as u32)));
    }

    #[test]
    fn fit_quality_stays_within_threshold() {
        let points: Vec<[f64; 2]> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.2;
                [t, t.sin() * 3.0]
            })
            .collect();
        let flat = flatten(&points);

        let error_threshold = 0.25;
        let config = FitConfig { error_threshold, ..FitConfig::default() };
        let out = fit_incremental(&flat, points.len() as u32, 2, &config).unwrap();

        assert!(out.cubics.len() < points.len());
    }

    #[test]
    fn f32_entry_point_matches_shape_of_f64_entry_point() {
        let points: Vec<[f32; 2]> = (0..12).map(|i| [i as f32, (i as f32 * 0.5).sin()]).collect();
        let flat: Vec<f32> = points.iter().flat_map(|p| p.iter().copied()).collect();

        let out = fit_incremental_f32(&flat, points.len() as u32, 2, &FitConfig::default()).unwrap();
        assert!(!out.cubics.is_empty());
        for [h_in, anchor, h_out] in &out.cubics {
            assert_eq!(h_in.len(), 2);
            assert_eq!(anchor.len(), 2);
            assert_eq!(h_out.len(), 2);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = fit_incremental(&[], 0, 2, &FitConfig::default()).unwrap_err();
        assert_eq!(err, FitError::EmptyInput);
    }

    #[test]
    fn zero_dims_is_rejected() {
        let err = fit_incremental(&[1.0, 2.0], 2, 0, &FitConfig::default()).unwrap_err();
        assert_eq!(err, FitError::ZeroDimensions);
    }

    #[test]
    fn negative_error_threshold_is_rejected() {
        let config = FitConfig { error_threshold: -1.0, ..FitConfig::default() };
        let err = fit_incremental(&[1.0, 2.0, 3.0, 4.0], 2, 2, &config).unwrap_err();
        assert_eq!(err, FitError::NegativeErrorThreshold(-1.0));
    }

    #[test]
    fn mismatched_points_length_is_rejected() {
        let err = fit_incremental(&[1.0, 2.0, 3.0], 2, 2, &FitConfig::default()).unwrap_err();
        assert_eq!(err, FitError::PointsLengthMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn single_point_is_its_own_degenerate_curve() {
        let out = fit_incremental(&[1.0, 2.0], 1, 2, &FitConfig::default()).unwrap();
        assert_eq!(out.cubics.len(), 1);
        assert_eq!(out.orig_index, vec![0]);
    }

    #[test]
    fn exhaustive_refit_does_not_panic_and_stays_in_threshold() {
        let points: Vec<[f64; 2]> = (0..25)
            .map(|i| {
                let t = i as f64 * 0.25;
                [t, (t * 2.0).cos()]
            })
            .collect();
        let flat = flatten(&points);

        let config = FitConfig { use_optimize_exhaustive: true, ..FitConfig::default() };
        let out = fit_incremental(&flat, points.len() as u32, 2, &config).unwrap();
        assert!(out.cubics.len() >= 2);
    }
}
