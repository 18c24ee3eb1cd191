//! Sample derivation and cross-process statistics aggregation.
use crate::group::{ProcessGroup, ReduceOp};
use crate::Result;

/// One local measurement of a timed bidirectional exchange.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    /// Wall-clock duration of the exchange in seconds.
    pub seconds: f64,

    /// Derived bandwidth in GB/s.
    pub gbps: f64,
}

impl Sample {
    /// Derive the local sample for one round. Both the sent and the
    /// received payload count as moved bytes, hence the factor of two.
    /// A zero elapsed time yields 0 GB/s rather than a division error.
    pub fn from_exchange(bytes: usize, seconds: f64) -> Sample {
        let gbps = if seconds > 0.0 {
            (2 * bytes) as f64 / seconds / 1e9
        } else {
            0.0
        };
        Sample { seconds, gbps }
    }
}

/// Reduced min/max/avg of one statistic across the group.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Group-wide statistics for one round. Only the coordinator ever
/// holds one of these.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RoundStats {
    /// Bandwidth statistics in GB/s.
    pub bandwidth: Summary,

    /// Duration statistics in seconds.
    pub duration: Summary,
}

/// Reduce one local value into a min/max/avg summary at `root`.
fn reduce_summary<G: ProcessGroup + ?Sized>(
    group: &mut G,
    value: f64,
    root: usize,
) -> Result<Option<Summary>> {
    let size = group.size() as f64;
    let min = group.reduce(value, ReduceOp::Min, root)?;
    let max = group.reduce(value, ReduceOp::Max, root)?;
    let sum = group.reduce(value, ReduceOp::Sum, root)?;
    Ok(match (min, max, sum) {
        (Some(min), Some(max), Some(sum)) => Some(Summary {
            min,
            max,
            avg: sum / size,
        }),
        _ => None,
    })
}

/// Combine the per-process samples for one round into group-wide
/// statistics at `root`. Every process must call this once per round;
/// only `root` receives `Some`.
///
/// Bandwidth and duration are reduced independently. The average
/// bandwidth is the arithmetic mean of the per-process samples, which
/// is deliberately not the same quantity as the bandwidth implied by
/// the average duration.
pub fn aggregate<G: ProcessGroup + ?Sized>(
    group: &mut G,
    sample: Sample,
    root: usize,
) -> Result<Option<RoundStats>> {
    let bandwidth = reduce_summary(group, sample.gbps, root)?;
    let duration = reduce_summary(group, sample.seconds, root)?;
    Ok(match (bandwidth, duration) {
        (Some(bandwidth), Some(duration)) => Some(RoundStats {
            bandwidth,
            duration,
        }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalRing;

    #[test]
    fn bandwidth_counts_both_directions() {
        let sample = Sample::from_exchange(1024, 0.001);
        assert_eq!(sample.gbps, 2.0 * 1024.0 / 0.001 / 1e9);
        assert_eq!(sample.seconds, 0.001);
    }

    #[test]
    fn zero_bytes_gives_zero_bandwidth() {
        let sample = Sample::from_exchange(0, 0.5);
        assert_eq!(sample.gbps, 0.0);
    }

    #[test]
    fn zero_elapsed_gives_zero_bandwidth() {
        let sample = Sample::from_exchange(4096, 0.0);
        assert_eq!(sample.gbps, 0.0);
    }

    #[test]
    fn solo_group_summary_is_the_sample() {
        let mut group = LocalRing::solo();
        let sample = Sample::from_exchange(1024, 0.001);
        let stats = aggregate(&mut group, sample, 0)
            .expect("reduction failed")
            .expect("coordinator must receive stats");
        assert_eq!(stats.bandwidth.min, sample.gbps);
        assert_eq!(stats.bandwidth.max, sample.gbps);
        assert_eq!(stats.bandwidth.avg, sample.gbps);
        assert_eq!(stats.duration.min, 0.001);
        assert_eq!(stats.duration.max, 0.001);
        assert_eq!(stats.duration.avg, 0.001);
    }
}
