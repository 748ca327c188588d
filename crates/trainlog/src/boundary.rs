//! Top-level error boundary.
//!
//! The host's `main` runs its body through [`run_guarded`]; anything that
//! escapes is reported here. Interrupts keep their default handling, other
//! errors are logged at critical severity once logging is initialized.

use crate::session::LoggingContext;
use crate::Error;
use std::backtrace::Backtrace;
use std::process::ExitCode;

/// Exit code conventionally used after SIGINT.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// How an unhandled error was dealt with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Interrupt passed to default handling
    Interrupted,
    /// Recorded through the logger at critical severity
    Logged,
    /// Printed to stderr because logging was never initialized
    Printed,
}

impl Disposition {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Disposition::Interrupted => ExitCode::from(INTERRUPTED_EXIT_CODE),
            Disposition::Logged | Disposition::Printed => ExitCode::FAILURE,
        }
    }
}

/// Also true for an interrupt wrapped in `anyhow` context.
fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::Interrupted))
}

/// What the runtime does with an error returned from `main`.
fn default_report(err: &anyhow::Error) {
    eprintln!("Error: {:?}", err);
}

/// Handle an error that escaped the host's main body.
///
/// The critical entry carries the error's `Caused by:` chain. A backtrace
/// is appended only when the error captured one, i.e. when
/// `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` enabled capture.
pub fn handle_unhandled(ctx: &LoggingContext, err: &anyhow::Error) -> Disposition {
    if is_interrupt(err) {
        default_report(err);
        return Disposition::Interrupted;
    }

    if ctx.is_initialized() {
        tracing::error!(
            critical = true,
            "Unhandled exception occurred:\n{:?}",
            err
        );
        Disposition::Logged
    } else {
        eprintln!("Unhandled exception occurred (logger not initialized):");
        default_report(err);
        Disposition::Printed
    }
}

/// Report an unhandled error and pick the process exit code.
pub fn report_unhandled(ctx: &LoggingContext, err: &anyhow::Error) -> ExitCode {
    handle_unhandled(ctx, err).exit_code()
}

/// Run the host's main body, reporting any error that escapes it.
pub fn run_guarded<F>(ctx: &LoggingContext, body: F) -> ExitCode
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match body() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_unhandled(ctx, &err),
    }
}

/// Log panics at critical severity, with a backtrace, for the rest of the
/// process.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(
            critical = true,
            "Unhandled panic occurred: {}\n{}",
            info,
            backtrace
        );
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SetupOptions;
    use anyhow::Context;
    use std::fs;
    use tempfile::tempdir;
    use tracing::level_filters::LevelFilter;

    fn initialized(root: &std::path::Path) -> LoggingContext {
        let mut ctx = LoggingContext::scoped();
        ctx.setup(
            &SetupOptions::new("d", "m")
                .log_dir(root)
                .console_level(LevelFilter::OFF),
        )
        .unwrap();
        ctx
    }

    fn same(a: ExitCode, b: ExitCode) -> bool {
        format!("{:?}", a) == format!("{:?}", b)
    }

    #[test]
    fn test_ok_body_succeeds() {
        let ctx = LoggingContext::scoped();
        assert!(same(run_guarded(&ctx, || Ok(())), ExitCode::SUCCESS));
    }

    #[test]
    fn test_error_logged_at_critical_when_initialized() {
        let root = tempdir().unwrap();
        let ctx = initialized(root.path());

        let err = Err::<(), _>(std::io::Error::other("disk gone"))
            .context("saving checkpoint")
            .unwrap_err();
        assert_eq!(handle_unhandled(&ctx, &err), Disposition::Logged);

        let log = fs::read_to_string(ctx.log_file().unwrap()).unwrap();
        assert!(log.contains("Unhandled exception occurred:"));
        assert!(log.contains("saving checkpoint"));
        assert!(log.contains("disk gone"));
    }

    #[test]
    fn test_critical_entry_carries_cause_chain() {
        let root = tempdir().unwrap();
        let ctx = initialized(root.path());

        let err = Err::<(), _>(std::io::Error::other("permission denied"))
            .context("opening shard 3")
            .context("loading dataset")
            .unwrap_err();
        assert!(same(run_guarded(&ctx, || Err(err)), ExitCode::FAILURE));

        let log = fs::read_to_string(ctx.log_file().unwrap()).unwrap();
        let entry = &log[log.find("Unhandled exception occurred:").unwrap()..];
        assert!(entry.contains("loading dataset"));
        assert!(entry.contains("Caused by:"));
        assert!(entry.find("opening shard 3") < entry.find("permission denied"));
    }

    #[test]
    fn test_interrupt_passes_through() {
        let root = tempdir().unwrap();
        let ctx = initialized(root.path());

        let err = anyhow::Error::new(Error::Interrupted);
        assert_eq!(handle_unhandled(&ctx, &err), Disposition::Interrupted);
        assert!(same(
            report_unhandled(&ctx, &err),
            ExitCode::from(INTERRUPTED_EXIT_CODE)
        ));

        let log = fs::read_to_string(ctx.log_file().unwrap()).unwrap();
        assert!(!log.contains("Unhandled exception occurred"));
    }

    #[test]
    fn test_uninitialized_prints() {
        let ctx = LoggingContext::scoped();
        let err = anyhow::anyhow!("early failure");
        assert_eq!(handle_unhandled(&ctx, &err), Disposition::Printed);
        assert!(same(run_guarded(&ctx, || Err(err)), ExitCode::FAILURE));
    }

    #[test]
    fn test_interrupt_with_context_is_still_an_interrupt() {
        let ctx = LoggingContext::scoped();
        let err = anyhow::Error::new(Error::Interrupted).context("while training");
        assert_eq!(handle_unhandled(&ctx, &err), Disposition::Interrupted);
    }
}
