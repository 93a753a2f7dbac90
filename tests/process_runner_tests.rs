//! Subprocess execution against real OS processes

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use godot_gate::process::resolve_executable;
use godot_gate::{FailureKind, ProcessRequest, ProcessRunner, SystemProcessRunner};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn missing_executable_is_a_launch_error_not_an_exit_code() {
    let result = SystemProcessRunner::new()
        .run(ProcessRequest::new("/nonexistent/bin/godot").arg("--version"))
        .await;

    assert!(result.launch_error.is_some());
    assert_eq!(result.exit_code, None);
    assert!(!result.timed_out);
    assert_eq!(result.failure_kind(), Some(FailureKind::Launch));
}

#[cfg(unix)]
#[tokio::test]
async fn output_and_exit_code_are_captured() {
    let result = SystemProcessRunner::new()
        .run(
            ProcessRequest::new("sh")
                .args(["-c", "echo out; echo err >&2; exit 7"])
                .timeout_secs(10),
        )
        .await;

    assert_eq!(result.exit_code, Some(7));
    assert_eq!(result.stdout.trim(), "out");
    assert_eq!(result.stderr.trim(), "err");
    assert_eq!(result.failure_kind(), Some(FailureKind::NonZeroExit));
}

#[cfg(unix)]
#[tokio::test]
async fn working_directory_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let result = SystemProcessRunner::new()
        .run(ProcessRequest::new("pwd").current_dir(dir.path()).timeout_secs(10))
        .await;

    assert!(result.success());
    let reported = PathBuf::from(result.stdout.trim()).canonicalize().unwrap();
    assert_eq!(reported, dir.path().canonicalize().unwrap());
}

#[cfg(unix)]
#[tokio::test]
async fn timed_out_process_is_killed_and_reaped() {
    let start = Instant::now();
    let result = SystemProcessRunner::new()
        .run(ProcessRequest::new("sleep").arg("30").timeout(Duration::from_millis(300)))
        .await;

    assert!(result.timed_out);
    assert_eq!(result.exit_code, None);
    assert!(start.elapsed() < Duration::from_secs(10));

    let pid = result.pid.expect("spawned process has a pid");
    if cfg!(target_os = "linux") {
        let proc_entry = PathBuf::from(format!("/proc/{}", pid));
        assert!(!proc_entry.exists(), "process {} still present", pid);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn deadline_caps_a_longer_request_timeout() {
    let runner = SystemProcessRunner::new().with_deadline(Instant::now() + Duration::from_millis(300));
    let start = Instant::now();
    let result = runner
        .run(ProcessRequest::new("sleep").arg("30").timeout_secs(600))
        .await;

    assert!(result.timed_out);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[cfg(unix)]
#[tokio::test]
async fn cancellation_stops_the_in_flight_child() {
    let token = CancellationToken::new();
    let runner: Arc<dyn ProcessRunner> =
        Arc::new(SystemProcessRunner::new().with_cancellation(token.clone()));

    let task = tokio::spawn({
        let runner = runner.clone();
        async move {
            runner
                .run(ProcessRequest::new("sleep").arg("30").timeout_secs(60))
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("run returns after cancellation")
        .unwrap();
    assert!(result.timed_out);
    assert!(result.cancelled);
    assert_eq!(
        result.failure_reason().as_deref(),
        Some("cancelled before completion")
    );
}

#[cfg(unix)]
#[test]
fn bare_names_resolve_through_path() {
    assert!(resolve_executable(std::path::Path::new("sh")).is_some());
    assert!(resolve_executable(std::path::Path::new("definitely-not-a-real-tool-xyz")).is_none());
}

#[cfg(target_os = "linux")]
fn is_gone(pid: i32) -> bool {
    // killed orphans may linger briefly as zombies until init reaps them
    for _ in 0..40 {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => return true,
            Ok(stat) => {
                let state = stat.rsplit(')').next().and_then(|rest| rest.trim().chars().next());
                if state == Some('Z') {
                    return true;
                }
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_kills_descendants_and_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("helper.pid");
    let script = format!(
        "echo partial-output; echo partial-error >&2; sleep 37 & echo $! > {}; wait; echo done",
        pid_file.display()
    );

    let start = Instant::now();
    let result = SystemProcessRunner::new()
        .run(ProcessRequest::new("sh").args(["-c", script.as_str()]).timeout(Duration::from_millis(500)))
        .await;

    assert!(result.timed_out);
    assert_eq!(result.stdout.trim(), "partial-output");
    assert_eq!(result.stderr.trim(), "partial-error");
    // the helper held the pipes; killing the group closes them without the drain grace
    assert!(start.elapsed() < Duration::from_secs(2));

    let helper: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    assert!(is_gone(helper), "helper process {} survived the timeout", helper);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn output_read_before_drain_grace_expires_is_kept() {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if resolve_executable(std::path::Path::new("setsid")).is_none() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("escaped.pid");
    // setsid moves the helper out of the process group, so it keeps stdout open
    let script = format!(
        "echo before-timeout; setsid sleep 37 & echo $! > {}; wait",
        pid_file.display()
    );

    let result = SystemProcessRunner::new()
        .run(ProcessRequest::new("sh").args(["-c", script.as_str()]).timeout(Duration::from_millis(500)))
        .await;

    if let Ok(raw) = std::fs::read_to_string(&pid_file) {
        if let Ok(pid) = raw.trim().parse::<i32>() {
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }

    assert!(result.timed_out);
    assert_eq!(result.stdout.trim(), "before-timeout");
}
