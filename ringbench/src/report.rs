//! Coordinator-side output formatting.
use crate::bench::BenchOptions;
use crate::memory::MemLocation;
use crate::stats::RoundStats;

/// One-time configuration echo printed before the loop begins.
pub fn banner(opts: &BenchOptions) -> String {
    let gpu = match opts.location {
        MemLocation::Device => "on",
        MemLocation::Host => "off",
    };
    format!(
        "Ring comm benchmark.\n\
         Message size: {} bytes (~{} GB).\n\
         Interval:     {} seconds.\n\
         GPU mode:     {}",
        opts.msg_size,
        opts.msg_size as f64 / 1e9,
        opts.interval_sec,
        gpu,
    )
}

/// Per-round statistics line. Bandwidth in GB/s, duration in
/// milliseconds, three decimal places each.
pub fn round_line(stats: &RoundStats) -> String {
    format!(
        "Bandwidth (send + recv): min = {:10.3} GB/s | max = {:10.3} GB/s | avg = {:10.3} GB/s \
         || Duration (send + recv): min = {:10.3} ms | max = {:10.3} ms | avg = {:10.3} ms",
        stats.bandwidth.min,
        stats.bandwidth.max,
        stats.bandwidth.avg,
        stats.duration.min * 1e3,
        stats.duration.max * 1e3,
        stats.duration.avg * 1e3,
    )
}
