//! Suppression before any setup. The switch is never lifted, so a later
//! setup creates its run directory but writes nothing.

use std::fs;
use tempfile::tempdir;
use trainlog::prelude::*;

#[test]
fn test_no_log_silences_process() {
    let root = tempdir().unwrap();
    let opts = SetupOptions::new("d", "m")
        .log_dir(root.path())
        .install_panic_hook(false);

    let mut logging = LoggingContext::new();
    assert!(logging.setup(&opts.clone().no_log(true)).is_none());
    assert!(!logging.is_initialized());
    assert!(logging.is_suppressed());
    assert!(trainlog::session::output_suppressed());
    assert!(!root.path().join("d").exists());
    assert!(!tracing::enabled!(tracing::Level::ERROR));

    let dir = logging.setup(&opts).expect("setup after suppression returns the run dir");
    assert!(logging.is_initialized());
    assert_eq!(dir.parent().unwrap(), root.path().join("d").join("m"));

    tracing::error!("still hidden");
    assert!(!tracing::enabled!(tracing::Level::ERROR));
    assert_eq!(fs::read_to_string(dir.join("result.log")).unwrap(), "");
}
