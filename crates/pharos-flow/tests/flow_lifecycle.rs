//! End-to-end flow lifecycle tests: capture sequencing, mutual exclusion,
//! and aggregation over the fake collaborator world.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_matches::assert_matches;

use pharos_core::{ActiveMode, FlowError, GatherMode};
use pharos_flow::testing::{FakeWorld, immediate_requestor};
use pharos_flow::{FlowOptions, NavigationRequestor, StepOptions};

#[tokio::test]
async fn mixed_flow_aggregates_in_capture_order() {
    let world = FakeWorld::new().with_final_url("https://shop.example/cart");
    let mut flow = world.flow(FlowOptions::default());

    let _ = flow.navigate(immediate_requestor(), None).await.unwrap();

    flow.start_timespan(Some(StepOptions::named("Add to cart")))
        .await
        .unwrap();
    let _ = flow.end_timespan().await.unwrap();

    let _ = flow.snapshot(None).await.unwrap();

    flow.start_navigation(None).await.unwrap();
    let _ = flow.end_navigation().await.unwrap();

    let result = flow.create_flow_result().await.unwrap();
    assert_eq!(result.name, "User flow (shop.example)");

    let names: Vec<_> = result.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Navigation report (shop.example/cart)",
            "Add to cart",
            "Snapshot report (shop.example/cart)",
            "Navigation report (shop.example/cart)",
        ]
    );

    let report = flow.generate_report().await.unwrap();
    assert!(report.contains("User flow (shop.example)"));
    assert!(report.contains("4 step(s)"));
}

#[tokio::test]
async fn every_operation_is_rejected_while_awaiting_trigger() {
    let mut flow = FakeWorld::new().flow(FlowOptions::default());
    flow.start_navigation(None).await.unwrap();

    assert_matches!(
        flow.navigate(immediate_requestor(), None).await,
        Err(FlowError::CaptureConflict {
            requested: GatherMode::Navigation,
            active: ActiveMode::Navigation,
        })
    );
    assert_matches!(
        flow.start_navigation(None).await,
        Err(FlowError::CaptureConflict { .. })
    );
    assert_matches!(
        flow.start_timespan(None).await,
        Err(FlowError::CaptureConflict {
            requested: GatherMode::Timespan,
            active: ActiveMode::Navigation,
        })
    );
    assert_matches!(
        flow.snapshot(None).await,
        Err(FlowError::CaptureConflict {
            requested: GatherMode::Snapshot,
            active: ActiveMode::Navigation,
        })
    );
    assert_matches!(
        flow.end_timespan().await,
        Err(FlowError::CaptureConflict {
            requested: GatherMode::Timespan,
            active: ActiveMode::Navigation,
        })
    );

    // none of the rejections disturbed the pending navigation
    assert_eq!(flow.step_count(), 0);
    let step = flow.end_navigation().await.unwrap();
    assert_eq!(step.artifacts.gather_mode, GatherMode::Navigation);
    assert_eq!(flow.current_mode(), None);
}

#[tokio::test]
async fn every_start_is_rejected_while_timespan_is_active() {
    let mut flow = FakeWorld::new().flow(FlowOptions::default());
    flow.start_timespan(None).await.unwrap();

    assert_matches!(
        flow.navigate(immediate_requestor(), None).await,
        Err(FlowError::CaptureConflict {
            active: ActiveMode::Timespan,
            ..
        })
    );
    assert_matches!(
        flow.start_navigation(None).await,
        Err(FlowError::CaptureConflict {
            active: ActiveMode::Timespan,
            ..
        })
    );
    assert_matches!(
        flow.start_timespan(None).await,
        Err(FlowError::CaptureConflict {
            active: ActiveMode::Timespan,
            ..
        })
    );

    let step = flow.end_timespan().await.unwrap();
    assert_eq!(step.name, "Timespan report (example.com/)");
}

#[tokio::test]
async fn caller_requestor_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let requestor: NavigationRequestor = Box::new(move || {
        Box::pin(async move {
            let _ = seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let mut flow = FakeWorld::new().flow(FlowOptions::default());
    let _ = flow.navigate(requestor, None).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn snapshots_do_not_count_as_navigations_for_storage_reset() {
    let mut flow = FakeWorld::new().flow(FlowOptions::default());
    let _ = flow.snapshot(None).await.unwrap();
    let _ = flow.snapshot(None).await.unwrap();

    let first_nav = flow
        .navigate(immediate_requestor(), None)
        .await
        .unwrap()
        .clone();
    assert_eq!(
        first_nav.flags.disable_storage_reset, None,
        "snapshots are not navigations; the first real navigation is a cold load"
    );

    let second_nav = flow
        .navigate(immediate_requestor(), None)
        .await
        .unwrap()
        .clone();
    assert_eq!(second_nav.flags.disable_storage_reset, Some(true));
}

#[tokio::test]
async fn deferred_navigation_applies_navigation_defaults() {
    let mut flow = FakeWorld::new().flow(FlowOptions::default());
    flow.start_navigation(None).await.unwrap();
    let first = flow.end_navigation().await.unwrap().clone();

    flow.start_navigation(None).await.unwrap();
    let second = flow.end_navigation().await.unwrap().clone();

    assert_eq!(first.flags.skip_about_blank, Some(true));
    assert_eq!(first.flags.disable_storage_reset, None);
    assert_eq!(second.flags.disable_storage_reset, Some(true));
}

#[tokio::test]
async fn failed_aggregation_keeps_steps_for_retry() {
    let world = FakeWorld::new().with_final_url("https://example.com/no-audit");
    let mut flow = world.flow(FlowOptions::default());
    let _ = flow.snapshot(None).await.unwrap();

    assert_matches!(
        flow.create_flow_result().await,
        Err(FlowError::MissingAuditResult { .. })
    );
    assert_eq!(flow.step_count(), 1);

    // a second pass fails the same way: no partial progress was kept
    assert_matches!(
        flow.create_flow_result().await,
        Err(FlowError::MissingAuditResult { .. })
    );
}

#[tokio::test]
async fn post_trigger_failure_leaves_flow_usable() {
    let world = FakeWorld::new().fail_after_trigger();
    let mut flow = world.flow(FlowOptions::default());

    flow.start_navigation(None).await.unwrap();
    assert_matches!(flow.end_navigation().await, Err(FlowError::Capture { .. }));

    // the machine is idle: a snapshot can still be captured and aggregated
    let _ = flow.snapshot(None).await.unwrap();
    let result = flow.create_flow_result().await.unwrap();
    assert_eq!(result.steps.len(), 1);
}

#[tokio::test]
async fn flow_level_flags_reach_every_step() {
    let mut options = FlowOptions::default();
    let _ = options
        .flags
        .extra
        .insert("formFactor".to_owned(), serde_json::json!("mobile"));
    let mut flow = FakeWorld::new().flow(options);

    let snap = flow.snapshot(None).await.unwrap().clone();
    assert_eq!(snap.flags.extra["formFactor"], serde_json::json!("mobile"));

    flow.start_timespan(None).await.unwrap();
    let span = flow.end_timespan().await.unwrap().clone();
    assert_eq!(span.flags.extra["formFactor"], serde_json::json!("mobile"));
}
