use std::sync::Arc;

use arrow::array::{BooleanArray, Int64Array, StringArray};
use profunda::config::CorrelationSettings;
use profunda::diagrams::{render_diagrams, JsonRenderer};
use profunda::prelude::*;
use profunda::stats::entropy::imbalance;
use profunda::summary::{CellValue, MissingDiagramKind, SampleKind};
use profunda::test_fixtures::{batch, correlated, customers, empty, frames};

fn profiler(settings: Settings) -> Profiler {
    Profiler::builder()
        .settings(settings)
        .registry(DispatchRegistry::with_builtin())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_integer_counts_on_every_backend() {
    let data = batch(vec![(
        "A",
        Arc::new(Int64Array::from(vec![
            Some(1),
            Some(2),
            Some(2),
            Some(3),
            Some(3),
            Some(3),
            None,
            None,
            Some(3),
            Some(1),
            Some(2),
        ])),
    )]);
    for frame in frames(&data, 3).await.unwrap() {
        let description = profiler(Settings::default()).describe(&frame).await.unwrap();
        let a = description.variable("A").unwrap();
        let backend = frame.backend();
        assert_eq!(a.count("n_missing").unwrap(), 2, "{backend}");
        assert_eq!(a.count("n").unwrap(), 11, "{backend}");
        assert_eq!(a.count("count").unwrap(), 9, "{backend}");
        assert_eq!(a.f64("p_missing").unwrap(), 2.0 / 11.0, "{backend}");
        assert_eq!(a.count("n_distinct").unwrap(), 3, "{backend}");
        assert_eq!(a.count("n_unique").unwrap(), 0, "{backend}");
        assert_eq!(a.get("is_unique"), Some(&SummaryValue::Boolean(false)));
    }
}

#[tokio::test]
async fn test_boolean_top_and_imbalance_on_every_backend() {
    let data = batch(vec![(
        "flag",
        Arc::new(BooleanArray::from(vec![
            Some(true),
            None,
            Some(true),
            Some(false),
            Some(true),
            Some(false),
            None,
        ])),
    )]);
    for frame in frames(&data, 2).await.unwrap() {
        let description = profiler(Settings::default()).describe(&frame).await.unwrap();
        let flag = description.variable("flag").unwrap();
        assert_eq!(
            flag.get("top"),
            Some(&SummaryValue::Value(CellValue::Boolean(true)))
        );
        assert_eq!(flag.count("freq").unwrap(), 3);
        let expected = imbalance([3, 2]);
        assert!((flag.f64("imbalance").unwrap() - expected).abs() < 1e-12);
    }
}

#[tokio::test]
async fn test_empty_table_on_every_backend() {
    for frame in frames(&empty(), 2).await.unwrap() {
        let description = profiler(Settings::default()).describe(&frame).await.unwrap();
        let duplicates = description.duplicates.unwrap();
        assert_eq!(duplicates.n_duplicates, 0);
        assert_eq!(duplicates.p_duplicates, 0.0);
        assert!(description.samples.is_empty());
        assert!(description.correlations[&CorrelationMethod::Pearson].is_empty());
        assert_eq!(description.table.n_var, 4);
        assert_eq!(description.table.n_vars_all_missing, 0, "{}", frame.backend());
        assert_eq!(description.table.n_vars_with_missing, 0);
    }
}

#[tokio::test]
async fn test_lazy_backend_degrades_with_warnings() {
    let settings = Settings::builder().samples(5, 5, 5).build().unwrap();
    let frames = frames(&customers(), 2).await.unwrap();
    let Some(lazy) = frames.iter().find(|f| f.backend() == BackendKind::Lazy) else {
        return;
    };
    let description = profiler(settings).describe(lazy).await.unwrap();

    let features: Vec<&str> = description
        .warnings
        .iter()
        .map(|warning| warning.feature.as_str())
        .collect();
    assert!(features.contains(&"missing:matrix"));
    assert!(features.contains(&"sample:tail"));
    assert!(features.contains(&"sample:random"));
    assert_eq!(description.samples.len(), 1);
    assert_eq!(description.samples[0].kind, SampleKind::Head);
    assert_eq!(description.samples[0].data.num_rows(), 5);
    assert!(description
        .missing
        .iter()
        .all(|diagram| diagram.kind() != MissingDiagramKind::Matrix));
}

#[tokio::test]
async fn test_memory_backend_builds_every_artifact() {
    let settings = Settings::builder()
        .samples(3, 3, 3)
        .random_seed(7)
        .build()
        .unwrap();
    let description = profiler(settings)
        .describe(&Frame::Memory(MemoryFrame::new(customers())))
        .await
        .unwrap();

    assert!(description.warnings.is_empty());
    assert_eq!(description.samples.len(), 3);
    assert_eq!(description.missing.len(), 3);
    assert!(description.analysis.finished_at >= description.analysis.started_at);
}

#[tokio::test]
async fn test_unsupported_correlation_fails_loudly() {
    let settings = Settings::builder()
        .correlations(CorrelationSettings {
            pearson: true,
            kendall: true,
            ..CorrelationSettings::default()
        })
        .build()
        .unwrap();
    for frame in frames(&correlated(20), 2).await.unwrap() {
        let result = profiler(settings.clone()).describe(&frame).await;
        match frame.backend() {
            BackendKind::Memory => {
                let description = result.unwrap();
                let kendall = &description.correlations[&CorrelationMethod::Kendall];
                assert_eq!(kendall.get("x", "y"), Some(1.0));
            }
            _ => assert!(result.unwrap_err().is_not_implemented()),
        }
    }
}

#[tokio::test]
async fn test_redacted_categoricals_hide_first_rows() {
    let data = batch(vec![(
        "secret",
        Arc::new(StringArray::from(vec!["a", "b", "c"])),
    )]);
    let settings = Settings::builder().redact(true).build().unwrap();
    for frame in frames(&data, 2).await.unwrap() {
        let description = profiler(settings.clone()).describe(&frame).await.unwrap();
        assert!(!description.variable("secret").unwrap().contains("first_rows"));
    }
}

#[tokio::test]
async fn test_rendered_diagrams() {
    let description = profiler(Settings::default())
        .describe(&Frame::Memory(MemoryFrame::new(correlated(30))))
        .await
        .unwrap();
    let rendered = render_diagrams(&JsonRenderer::new(), &description).unwrap();

    assert!(rendered.contains_key("histogram:x"));
    assert!(rendered.contains_key("correlation:pearson"));
    assert!(rendered.contains_key("missing:bar"));
    let payload: serde_json::Value = serde_json::from_str(&rendered["histogram:x"]).unwrap();
    let total: u64 = payload["counts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|count| count.as_u64().unwrap())
        .sum();
    assert_eq!(total, 30);
}
