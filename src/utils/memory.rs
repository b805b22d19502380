//! Peak memory sampling through a counting global allocator.

use peak_alloc::PeakAlloc;

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

/// Bytes currently allocated by the process.
pub fn current_usage() -> usize {
    PEAK_ALLOC.current_usage()
}

/// Highest allocation level seen since start or the last reset.
pub fn peak_usage() -> usize {
    PEAK_ALLOC.peak_usage()
}

pub fn reset_peak_usage() {
    PEAK_ALLOC.reset_peak_usage();
}
