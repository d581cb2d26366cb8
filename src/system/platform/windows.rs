use super::{CpuTimes, MemoryUsage, PlatformExtensions};

pub struct Platform;

#[cfg(target_os = "windows")]
use windows_sys::Win32::{
    Foundation::{CloseHandle, FILETIME},
    System::Threading::{GetProcessTimes, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION},
};

impl PlatformExtensions for Platform {
    #[cfg(target_os = "windows")]
    fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return None;
            }
            let mut creation = std::mem::zeroed::<FILETIME>();
            let mut exit = std::mem::zeroed::<FILETIME>();
            let mut kernel = std::mem::zeroed::<FILETIME>();
            let mut user = std::mem::zeroed::<FILETIME>();
            let ok = GetProcessTimes(handle, &mut creation, &mut exit, &mut kernel, &mut user);
            CloseHandle(handle);
            if ok == 0 {
                return None;
            }
            Some(CpuTimes {
                user_us: filetime_to_us(&user),
                system_us: filetime_to_us(&kernel),
            })
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn process_cpu_times(_pid: u32) -> Option<CpuTimes> {
        None
    }

    fn process_memory(_pid: u32) -> Option<MemoryUsage> {
        None
    }
}

/// FILETIME durations count 100ns intervals.
#[cfg(target_os = "windows")]
fn filetime_to_us(ft: &FILETIME) -> u64 {
    let intervals = ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64;
    intervals / 10
}
