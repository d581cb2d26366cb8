use libproc::libproc::proc_pid::pidinfo;
use libproc::libproc::task_info::TaskInfo;

use super::{CpuTimes, MemoryUsage, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
        let info = pidinfo::<TaskInfo>(pid as i32, 0).ok()?;
        // pti_total_* are mach absolute time units, not nanoseconds on arm64
        let (numer, denom) = timebase();
        let to_us = |ticks: u64| {
            let nanos = (ticks as u128 * numer as u128) / denom.max(1) as u128;
            (nanos / 1_000) as u64
        };
        Some(CpuTimes {
            user_us: to_us(info.pti_total_user),
            system_us: to_us(info.pti_total_system),
        })
    }

    fn process_memory(_pid: u32) -> Option<MemoryUsage> {
        // No anonymous/file split is exposed; the collector falls back to sysinfo
        None
    }
}

#[allow(deprecated)]
fn timebase() -> (u32, u32) {
    let mut info = libc::mach_timebase_info { numer: 0, denom: 0 };
    // SAFETY: info is a valid, writable mach_timebase_info.
    let status = unsafe { libc::mach_timebase_info(&mut info) };
    if status != 0 || info.denom == 0 {
        (1, 1)
    } else {
        (info.numer, info.denom)
    }
}
