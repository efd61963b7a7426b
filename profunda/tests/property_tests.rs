//! Property-based tests for the statistical invariants.
//!
//! Each property runs the full profiler on generated data, on every compiled
//! backend where the property is backend independent.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use proptest::prelude::*;
use profunda::prelude::*;
use profunda::stats::histogram::histogram;
use profunda::test_fixtures::{batch, frames};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn profiler(settings: Settings) -> Profiler {
    Profiler::builder()
        .settings(settings)
        .registry(DispatchRegistry::with_builtin())
        .build()
        .unwrap()
}

fn float_values() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(
        prop_oneof![
            8 => (-1e6..1e6f64).prop_map(Some),
            1 => Just(None),
            1 => Just(Some(f64::INFINITY)),
            1 => Just(Some(f64::NEG_INFINITY)),
            1 => Just(Some(f64::NAN)),
        ],
        1..80,
    )
}

fn signed_values() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(
        prop_oneof![
            8 => (-1e3..1e3f64).prop_map(Some),
            2 => Just(Some(-0.0)),
            2 => Just(Some(0.0)),
            1 => Just(None),
            1 => Just(Some(f64::NAN)),
            1 => Just(Some(f64::INFINITY)),
            1 => Just(Some(f64::NEG_INFINITY)),
        ],
        1..60,
    )
}

fn close(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b || (a - b).abs() <= 1e-9 * a.abs().max(1.0)
}

const FLOAT_STATISTICS: &[&str] = &["mean", "std", "5%", "25%", "50%", "75%", "95%", "mad"];

const COUNT_STATISTICS: &[&str] = &["n_zeros", "n_negative", "n_distinct"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn numeric_statistics_agree_across_backends(values in signed_values()) {
        let data = batch(vec![("x", Arc::new(Float64Array::from(values)) as ArrayRef)]);
        let rt = runtime();
        let frames = rt.block_on(frames(&data, 3)).unwrap();
        let reference = rt.block_on(profiler(Settings::default()).describe(&frames[0])).unwrap();
        let expected = reference.variable("x").unwrap();

        for frame in &frames[1..] {
            let description = rt.block_on(profiler(Settings::default()).describe(frame)).unwrap();
            let actual = description.variable("x").unwrap();
            for key in FLOAT_STATISTICS {
                let (a, b) = (expected.f64(key).unwrap(), actual.f64(key).unwrap());
                prop_assert!(close(a, b), "{} {}: {} != {}", frame.backend(), key, a, b);
            }
            for key in COUNT_STATISTICS {
                prop_assert_eq!(
                    expected.count(key).unwrap(),
                    actual.count(key).unwrap(),
                    "{} {}",
                    frame.backend(),
                    key
                );
            }
        }
    }

    #[test]
    fn histogram_counts_every_finite_value(values in float_values(), bins in 1usize..60) {
        let plain: Vec<f64> = values.iter().flatten().copied().collect();
        let finite = plain.iter().filter(|v| v.is_finite()).count() as u64;
        let result = histogram(&plain, bins).unwrap();
        prop_assume!(finite > 0);

        prop_assert_eq!(result.bin_edges.len(), bins + 1);
        prop_assert!(result.bin_edges.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(result.total(), finite);

        let settings = Settings::builder().histogram_bins(bins).build().unwrap();
        let data = batch(vec![("x", Arc::new(Float64Array::from(values)))]);
        let rt = runtime();
        for frame in rt.block_on(frames(&data, 3)).unwrap() {
            let description = rt.block_on(profiler(settings.clone()).describe(&frame)).unwrap();
            let summary = description.variable("x").unwrap();
            let profiled = summary.histogram("histogram").unwrap();
            prop_assert_eq!(profiled.bin_edges.len(), bins + 1);
            prop_assert_eq!(profiled.total(), finite, "{}", frame.backend());
        }
    }

    #[test]
    fn short_columns_have_nan_shape_moments(values in prop::collection::vec(-1000i64..1000, 0..4)) {
        let n = values.len();
        let data = batch(vec![("x", Arc::new(Int64Array::from(values)))]);
        let rt = runtime();
        for frame in rt.block_on(frames(&data, 2)).unwrap() {
            let description = rt.block_on(profiler(Settings::default()).describe(&frame)).unwrap();
            let summary = description.variable("x").unwrap();
            if n < 3 {
                prop_assert!(summary.f64("skewness").unwrap().is_nan());
            }
            prop_assert!(summary.f64("kurtosis").unwrap().is_nan());
        }
    }

    #[test]
    fn constant_columns_have_zero_shape_moments(value in -1000i64..1000, n in 4usize..40) {
        let data = batch(vec![("x", Arc::new(Int64Array::from(vec![value; n])))]);
        let rt = runtime();
        for frame in rt.block_on(frames(&data, 3)).unwrap() {
            let description = rt.block_on(profiler(Settings::default()).describe(&frame)).unwrap();
            let summary = description.variable("x").unwrap();
            prop_assert_eq!(summary.f64("skewness").unwrap(), 0.0, "{}", frame.backend());
            prop_assert_eq!(summary.f64("kurtosis").unwrap(), 0.0, "{}", frame.backend());
        }
    }

    #[test]
    fn correlation_matrix_is_symmetric(
        rows in prop::collection::vec((-100i64..100, -100i64..100, -100i64..100), 3..40)
    ) {
        let column = |pick: fn(&(i64, i64, i64)) -> i64| -> ArrayRef {
            Arc::new(Int64Array::from(rows.iter().map(pick).collect::<Vec<_>>()))
        };
        let data = batch(vec![
            ("a", column(|r| r.0)),
            ("b", column(|r| r.1)),
            ("c", column(|r| r.2)),
        ]);
        let rt = runtime();
        for frame in rt.block_on(frames(&data, 2)).unwrap() {
            let description = rt.block_on(profiler(Settings::default()).describe(&frame)).unwrap();
            let matrix = &description.correlations[&CorrelationMethod::Pearson];
            for (i, a) in matrix.columns.iter().enumerate() {
                for b in &matrix.columns {
                    let ab = matrix.get(a, b).unwrap();
                    let ba = matrix.get(b, a).unwrap();
                    prop_assert!(ab == ba || (ab.is_nan() && ba.is_nan()));
                }
                let variance = description.variable(a).unwrap().f64("variance").unwrap();
                if variance > 0.0 {
                    prop_assert!((matrix.values[i][i] - 1.0).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn duplicate_detection_is_idempotent(
        rows in prop::collection::vec((0i64..4, prop::option::of(0i64..3)), 0..40)
    ) {
        let data = batch(vec![
            ("a", Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>()))),
            ("b", Arc::new(Int64Array::from(rows.iter().map(|r| r.1).collect::<Vec<_>>()))),
        ]);
        let rt = runtime();
        for frame in rt.block_on(frames(&data, 3)).unwrap() {
            let first = rt.block_on(profiler(Settings::default()).describe(&frame)).unwrap();
            let second = rt.block_on(profiler(Settings::default()).describe(&frame)).unwrap();
            let (first, second) = (first.duplicates.unwrap(), second.duplicates.unwrap());
            prop_assert_eq!(first.n_duplicates, second.n_duplicates);
            prop_assert_eq!(first.p_duplicates, second.p_duplicates);
            prop_assert_eq!(first.rows, second.rows);
        }
    }
}
