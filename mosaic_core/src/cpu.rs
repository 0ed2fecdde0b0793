// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Logical CPU count discovery.
//!
//! The thread pool sizes itself at one worker per logical CPU by default.
//! On Linux this counts `/sys/devices/system/cpu/cpu<N>` directories rather
//! than trusting any single API, since that's what's actually iterated by
//! `/sys` consumers and it works the same under containers/cgroup quotas as
//! it does bare-metal (quotas throttle, they don't hide cpus from `/sys`).

use std::path::Path;

const MAX_PROBED_CPUS: u32 = 1024;

/// Returns the number of logical CPUs available, with a floor of 1.
#[must_use]
pub fn count() -> usize {
    count_under(Path::new("/sys/devices/system/cpu")).max(1)
}

fn count_under(sys_cpu_dir: &Path) -> usize {
    let mut n = 0usize;

    for i in 0..MAX_PROBED_CPUS {
        if sys_cpu_dir.join(format!("cpu{i}")).is_dir() {
            n += 1;
        } else if i > 0 {
            // cpu directories are contiguous from cpu0; the first gap ends
            // the scan.
            break;
        }
    }

    if n > 0 {
        return n;
    }

    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn counts_contiguous_cpu_directories() {
        let dir = std::env::temp_dir().join(format!(
            "mosaic_cpu_test_{}_{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        fs::create_dir_all(&dir).expect("create temp sysfs stand-in");
        for i in 0..4 {
            fs::create_dir_all(dir.join(format!("cpu{i}"))).expect("create cpuN dir");
        }
        // A non-cpu-numbered sibling should not confuse the scan.
        fs::create_dir_all(dir.join("cpufreq")).expect("create unrelated dir");

        assert_eq!(count_under(&dir), 4);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn falls_back_to_available_parallelism_when_sysfs_is_absent() {
        let dir = Path::new("/nonexistent/mosaic/sysfs/stand-in");
        assert!(count_under(dir) >= 1);
    }

    #[test]
    fn never_reports_zero() {
        assert!(count() >= 1);
    }
}
