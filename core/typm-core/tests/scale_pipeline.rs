mod common;

use common::{descriptor, fast_config, EngineBehavior, FakeSession};
use typm_core::catalog::{baseline_descriptor, FontCatalog};
use typm_core::pipeline::run_scale_pipeline;
use typm_core::scale::measure_catalog_scales;
use typm_core::store::{FontResult, PersistMode, ResultStore};

#[tokio::test]
async fn healthy_engine_yields_rounded_scales() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("google-fonts.json");
    let mut catalog = FontCatalog::new();
    catalog.insert("wide-face".to_string(), descriptor("Wide Face"));
    let store = ResultStore::new(PersistMode::Aggregate { path: out.clone() });

    let sessions = vec![FakeSession::new(EngineBehavior::Healthy)];
    let summary = run_scale_pipeline(sessions, &catalog, &fast_config(), &store).await;

    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.failure_count, 0);

    let artifact = std::fs::read_to_string(&out).expect("artifact");
    let parsed: indexmap::IndexMap<String, FontResult> =
        serde_json::from_str(&artifact).expect("parse");
    let result = parsed.get("wide-face").expect("entry");

    // Fake engine: baseline 500x100, targets 640x128.
    assert_eq!(result.width_scale, Some(0.781));
    assert_eq!(result.height_scale, Some(0.781));
    assert_eq!(result.scale, result.width_scale, "scale aliases widthScale");
    assert!(result.measurement_error.is_none());
}

#[tokio::test]
async fn never_loading_font_falls_back_to_identity_scale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("google-fonts.json");
    let mut catalog = FontCatalog::new();
    catalog.insert("ghost-face".to_string(), descriptor("Ghost Face"));
    let store = ResultStore::new(PersistMode::Aggregate { path: out.clone() });

    let sessions = vec![FakeSession::new(EngineBehavior::NeverLoads)];
    let summary = run_scale_pipeline(sessions, &catalog, &fast_config(), &store).await;

    // The fallback is handled, not a failure: the run completes clean.
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.failure_count, 0);

    let artifact = std::fs::read_to_string(&out).expect("artifact");
    let parsed: indexmap::IndexMap<String, FontResult> =
        serde_json::from_str(&artifact).expect("parse");
    let result = parsed.get("ghost-face").expect("entry");

    assert_eq!(result.scale, Some(1.0));
    assert_eq!(result.width_scale, Some(1.0));
    assert_eq!(result.height_scale, Some(1.0));
    assert!(result
        .measurement_error
        .as_deref()
        .expect("fallback recorded")
        .contains("fallback"));
}

#[tokio::test]
async fn baseline_identical_font_skips_rendering() {
    let mut session = FakeSession::new(EngineBehavior::Healthy);
    let fonts = vec![("roboto".to_string(), baseline_descriptor())];

    let scales = measure_catalog_scales(&mut session, &fonts, &fast_config()).await;

    assert_eq!(session.presents, 0, "identity fonts never render");
    let result = scales.get("roboto").expect("entry");
    assert_eq!(result.outcome.width_scale, 1.0);
    assert_eq!(result.outcome.height_scale, 1.0);
    assert!(result.fallback.is_none());
}

#[tokio::test]
async fn results_preserve_input_order() {
    let mut session = FakeSession::new(EngineBehavior::Healthy);
    let fonts = vec![
        ("zulu".to_string(), descriptor("Zulu")),
        ("roboto".to_string(), baseline_descriptor()),
        ("alpha".to_string(), descriptor("Alpha")),
    ];

    let scales = measure_catalog_scales(&mut session, &fonts, &fast_config()).await;
    let keys: Vec<&String> = scales.keys().collect();
    assert_eq!(keys, vec!["zulu", "roboto", "alpha"]);
}
