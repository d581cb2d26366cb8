use super::snapshot::{CpuTimes, MemoryUsage};

pub trait PlatformExtensions {
    /// User/system CPU time consumed by `pid` since it started.
    fn process_cpu_times(pid: u32) -> Option<CpuTimes>;
    /// Heap/resident breakdown for `pid`, when the OS exposes one.
    fn process_memory(pid: u32) -> Option<MemoryUsage>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(target_os = "windows")]
use windows as platform_impl;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod platform_impl {
    use super::{CpuTimes, MemoryUsage, PlatformExtensions};

    pub struct Platform;

    impl PlatformExtensions for Platform {
        fn process_cpu_times(_pid: u32) -> Option<CpuTimes> {
            None
        }

        fn process_memory(_pid: u32) -> Option<MemoryUsage> {
            None
        }
    }
}

pub fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
    platform_impl::Platform::process_cpu_times(pid)
}

pub fn process_memory(pid: u32) -> Option<MemoryUsage> {
    platform_impl::Platform::process_memory(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_do_not_panic_for_current_pid() {
        let pid = std::process::id();
        let _ = process_cpu_times(pid);
        let _ = process_memory(pid);
    }

    #[test]
    fn wrappers_return_none_for_missing_pid() {
        // PIDs are capped well below u32::MAX on every supported platform.
        assert!(process_memory(u32::MAX - 1).is_none());
    }
}
