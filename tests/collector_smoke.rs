use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use heapwatch::error::MonitorError;
use heapwatch::system::collector::{Collector, MetricSource};

fn spawn_long_lived_child() -> Child {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = Command::new("powershell");
        c.args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "Start-Sleep -Seconds 30",
        ]);
        c
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = Command::new("sh");
        c.args(["-c", "sleep 30"]);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn child process")
}

fn capture_with_retry(collector: &mut Collector, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if collector.capture().is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn current_process_snapshots_advance() {
    let mut collector = Collector::current_process().expect("current pid");
    let first = collector.capture().expect("first capture");
    thread::sleep(Duration::from_millis(5));
    let second = collector.capture().expect("second capture");

    assert!(second.timestamp > first.timestamp);
    assert!(second.memory.rss > 0);
    assert!(second.cpu.total_us() >= first.cpu.total_us());
    assert!(second.system.total_memory >= second.system.free_memory);
    assert_eq!(second.system.logical_cores, collector.logical_cores());
}

#[test]
fn child_process_becomes_unavailable_after_exit() {
    let mut child = spawn_long_lived_child();
    let mut collector = Collector::for_pid(child.id());
    assert_eq!(collector.pid(), child.id());
    assert!(
        capture_with_retry(&mut collector, Duration::from_secs(3)),
        "child pid never became visible"
    );

    child.kill().expect("kill child");
    child.wait().expect("reap child");

    let err = collector.capture().unwrap_err();
    assert!(matches!(err, MonitorError::Unavailable(_)));
}
