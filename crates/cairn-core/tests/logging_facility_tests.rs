#![allow(clippy::unwrap_used, clippy::expect_used)]

use cairn_core::errors::{RepoError, RepoErrorKind};
use cairn_core::logging_facility::test_capture::init_test_capture;
use cairn_core::{log_op_end, log_op_error, log_op_start};
use cairn_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, handle = 7);

    let starts: Vec<_> = capture
        .events_for(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].field("handle"), Some("7"));
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let ends = capture.events_for(op_name);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(ends[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";
    let err = RepoError::new(RepoErrorKind::PotentialDuplicate)
        .with_message("fingerprint collides")
        .with_duplicate_of(7);

    log_op_error!(op_name, &err, duration_ms = 5);

    let events = capture.events_for(op_name);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(event.level, tracing::Level::ERROR);
    assert_eq!(event.field("err_kind"), Some("PotentialDuplicate"));
    assert_eq!(event.field("err_code"), Some("ERR_POTENTIAL_DUPLICATE"));
}

#[test]
fn test_assert_event_exists_helper() {
    let capture = init_test_capture();
    log_op_start!("test_assert_helper_unique_4");
    capture.assert_event_exists("test_assert_helper_unique_4", EVENT_START);
}
