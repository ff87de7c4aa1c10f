//! Process-group control for spawned shell commands

/// Put the child in a new process group whose id equals its pid, so a timeout
/// can reach every descendant.
#[cfg(unix)]
pub fn isolate_process_group(command: &mut tokio::process::Command) {
    command.process_group(0);
}

#[cfg(not(unix))]
pub fn isolate_process_group(command: &mut tokio::process::Command) {
    let _ = command;
}

/// SIGKILL the whole group led by `pid`, falling back to the pid alone.
/// Returns whether a signal was delivered.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(raw_pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    let group_ok = unsafe { libc::kill(-raw_pid, libc::SIGKILL) == 0 };
    if group_ok {
        return true;
    }
    unsafe { libc::kill(raw_pid, libc::SIGKILL) == 0 }
}

#[cfg(not(unix))]
pub fn kill_process_group(pid: u32) -> bool {
    let _ = pid;
    false
}
