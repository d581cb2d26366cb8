use super::{CpuTimes, MemoryUsage, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
        let contents = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        parse_stat_cpu_times(&contents, clock_ticks_per_second())
    }

    fn process_memory(pid: u32) -> Option<MemoryUsage> {
        let contents = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        parse_status_memory(&contents)
    }
}

fn clock_ticks_per_second() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 { ticks as u64 } else { 100 }
}

/// Extract utime/stime from `/proc/{pid}/stat`, converted to microseconds.
fn parse_stat_cpu_times(contents: &str, ticks_per_second: u64) -> Option<CpuTimes> {
    // comm field may contain spaces and parens, so find the closing )
    let after_comm = contents.rfind(')')? + 1;
    let fields: Vec<&str> = contents[after_comm..].split_whitespace().collect();
    // Fields after comm: state(0) ppid(1) pgrp(2) session(3) tty_nr(4)
    // tpgid(5) flags(6) minflt(7) cminflt(8) majflt(9) cmajflt(10)
    // utime(11) stime(12)
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    let to_us = |ticks: u64| ticks.saturating_mul(1_000_000) / ticks_per_second.max(1);
    Some(CpuTimes {
        user_us: to_us(utime),
        system_us: to_us(stime),
    })
}

/// Read the `Vm*`/`Rss*` lines of `/proc/{pid}/status` (values in kB).
fn parse_status_memory(contents: &str) -> Option<MemoryUsage> {
    let mut rss = None;
    let mut anon = None;
    let mut file = 0;
    let mut shmem = 0;
    let mut data = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(kb) = value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        let bytes = kb.saturating_mul(1024);
        match key {
            "VmRSS" => rss = Some(bytes),
            "RssAnon" => anon = Some(bytes),
            "RssFile" => file = bytes,
            "RssShmem" => shmem = bytes,
            "VmData" => data = Some(bytes),
            _ => {}
        }
    }

    // Kernel threads report no Vm* lines at all.
    let rss = rss?;
    let heap_used = anon.unwrap_or(rss);
    Some(MemoryUsage {
        rss,
        heap_total: data.unwrap_or(heap_used).max(heap_used),
        heap_used,
        external: file.saturating_add(shmem),
    })
}
