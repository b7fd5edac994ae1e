use std::io;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};
use tracing::{debug, info};

use crate::error::ProcessError;

/// Sends a graceful termination request (SIGTERM, or the platform's plain
/// kill where SIGTERM is not supported).
pub fn terminate_process(sys: &mut System, pid: u32) -> Result<(), ProcessError> {
    let sysinfo_pid = Pid::from_u32(pid);
    refresh_pid(sys, sysinfo_pid);

    let Some(process) = sys.process(sysinfo_pid) else {
        return Err(ProcessError::NotFound(pid));
    };

    let delivered = match process.kill_with(Signal::Term) {
        Some(delivered) => delivered,
        // Signal not supported on this platform, fall back to kill()
        None => process.kill(),
    };
    if delivered {
        info!(pid, "sent termination request");
        return Ok(());
    }

    let os_error = io::Error::last_os_error();
    debug!(pid, error = %os_error, "termination request failed");
    refresh_pid(sys, sysinfo_pid);
    Err(classify_failure(
        pid,
        &os_error,
        sys.process(sysinfo_pid).is_some(),
    ))
}

fn refresh_pid(sys: &mut System, pid: Pid) {
    let pids = [pid];
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&pids),
        true,
        ProcessRefreshKind::nothing(),
    );
}

/// Maps a failed signal delivery onto the recoverable error taxonomy.
pub fn classify_failure(pid: u32, os_error: &io::Error, still_alive: bool) -> ProcessError {
    if !still_alive || os_error.kind() == io::ErrorKind::NotFound {
        return ProcessError::NotFound(pid);
    }
    if os_error.kind() == io::ErrorKind::PermissionDenied {
        return ProcessError::AccessDenied(pid);
    }
    ProcessError::Failed {
        pid,
        reason: os_error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_process_is_not_found() {
        let err = io::Error::from(io::ErrorKind::Other);
        assert_eq!(classify_failure(9, &err, false), ProcessError::NotFound(9));
    }

    #[test]
    fn permission_error_is_access_denied() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            classify_failure(9, &err, true),
            ProcessError::AccessDenied(9)
        );
    }

    #[test]
    fn other_errors_keep_their_reason() {
        let err = io::Error::other("device busy");
        match classify_failure(9, &err, true) {
            ProcessError::Failed { pid, reason } => {
                assert_eq!(pid, 9);
                assert!(reason.contains("device busy"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
