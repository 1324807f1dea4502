//! Pipelines built from deserialized settings.

use super::{request, slow};
use http_resilience::{
    CancellationSignal, FixedStatus, PipelineSettings, StageDescriptor, StageOrder,
};
use http::StatusCode;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

#[test]
fn empty_settings_use_defaults() {
    let settings: PipelineSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, PipelineSettings::default());
    assert_eq!(settings.timeout(), Duration::from_secs(20));
    assert_eq!(settings.max_attempts, 2);
    assert_eq!(settings.order, StageOrder::TimeoutAroundRetry);
}

#[test]
fn unknown_order_is_rejected() {
    let parsed = serde_json::from_str::<PipelineSettings>(r#"{ "order": "sideways" }"#);
    assert!(parsed.is_err());
}

#[test]
fn settings_decide_stage_order() {
    let settings: PipelineSettings = serde_json::from_str(
        r#"{ "timeout_ms": 250, "max_attempts": 4, "order": "retry_around_timeout" }"#,
    )
    .unwrap();

    let pipeline = settings.build(FixedStatus::new(StatusCode::OK));
    assert_eq!(
        pipeline.stages(),
        &[
            StageDescriptor::Retry(4),
            StageDescriptor::Timeout(Duration::from_millis(250))
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn settings_pipeline_enforces_the_deadline() {
    let settings = PipelineSettings {
        timeout_ms: 100,
        ..PipelineSettings::default()
    };
    let (leaf, calls) = slow(Duration::from_secs(1));
    let pipeline = settings.build(leaf);

    let start = Instant::now();
    let outcome = pipeline.process(request(), CancellationSignal::new()).await;

    assert!(outcome.unwrap_err().is_timeout());
    assert!(start.elapsed() < Duration::from_millis(110));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
