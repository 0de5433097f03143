//! Unit tests for the error banner.

use deck_console::report::{ErrorBanner, ErrorReporter};
use deck_console::AppError;

#[test]
fn new_banner_is_empty() {
    let banner = ErrorBanner::new();
    assert!(banner.current().is_none());
    assert_eq!(banner.reported_count(), 0);
}

#[test]
fn report_shows_message_without_prefix() {
    let banner = ErrorBanner::new();
    banner.report(&AppError::Api("disk full".into()));

    let entry = banner.current().expect("banner visible");
    assert_eq!(entry.message, "disk full");
    assert_eq!(banner.reported_count(), 1);
}

#[test]
fn latest_report_replaces_previous_one() {
    let banner = ErrorBanner::new();
    banner.report(&AppError::Transport("connection refused".into()));
    banner.report(&AppError::Capture("capture release failed".into()));

    assert_eq!(
        banner.current().map(|entry| entry.message),
        Some("capture release failed".to_owned())
    );
    assert_eq!(banner.reported_count(), 2);
}

#[test]
fn message_stays_until_dismissed() {
    let banner = ErrorBanner::new();
    banner.report(&AppError::Api("boom".into()));
    assert!(banner.current().is_some());
    assert!(banner.current().is_some());

    banner.dismiss();
    assert!(banner.current().is_none());
    assert_eq!(banner.reported_count(), 1);
}
