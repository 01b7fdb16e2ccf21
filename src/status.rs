//! Process exit codes reported by the bootstrapper.

use std::process::ExitStatus;

/// The bootstrap sequence itself failed before a worker could be launched.
pub const EXIT_BOOTSTRAP_FAILURE: i32 = 125;

/// The interpreter exists but could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// The worker entry point or its interpreter was not found.
pub const EXIT_LAUNCH_FAILURE: i32 = 127;

/// Base added to a terminating signal number (shell convention).
const SIGNAL_EXIT_BASE: i32 = 128;

/// Translates a child's termination status into the code to exit with.
///
/// A normal exit yields the child's own code unchanged. On Unix, a child
/// killed by signal `S` yields `128 + S`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }
    }

    EXIT_BOOTSTRAP_FAILURE
}
