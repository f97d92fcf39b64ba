use std::time::Duration;

/// Upper bound of a single fio run,
/// such that a soak run can be terminated in a timely fashion
/// when an error occurs elsewhere.
pub const DEFAULT_SEGMENT_LENGTH: Duration = Duration::from_secs(60);

/// Splits a total duration into whole-second segments of at most
/// `segment_length` seconds.
///
/// Sub-second remainders of the total duration are dropped.
/// A sub-second segment length is treated as one second.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    remaining: u64,
    segment_length: u64,
}

impl SegmentPlan {
    pub fn new(total: Duration, segment_length: Duration) -> Self {
        Self {
            remaining: total.as_secs(),
            segment_length: segment_length.as_secs().max(1),
        }
    }

    /// Seconds which are not yet handed out as a segment.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for SegmentPlan {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let segment = self.remaining.min(self.segment_length);
        self.remaining -= segment;
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.div_ceil(self.segment_length) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SegmentPlan {}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(secs: u64) -> Vec<u64> {
        SegmentPlan::new(Duration::from_secs(secs), DEFAULT_SEGMENT_LENGTH).collect()
    }

    #[test]
    fn test_segment_plan_examples() {
        for (secs, expected) in [
            (0, vec![]),
            (1, vec![1]),
            (45, vec![45]),
            (60, vec![60]),
            (61, vec![60, 1]),
            (150, vec![60, 60, 30]),
            (180, vec![60, 60, 60]),
        ] {
            assert_eq!(plan(secs), expected, "secs: {secs}");
        }
    }

    #[test]
    fn test_segment_plan_properties() {
        for secs in 1..=1000 {
            let segments = plan(secs);
            assert_eq!(segments.iter().sum::<u64>(), secs, "secs: {secs}");
            assert_eq!(segments.len() as u64, secs.div_ceil(60), "secs: {secs}");
            let (last, init) = segments.split_last().unwrap();
            assert!(*last > 0 && *last <= 60, "secs: {secs}");
            assert!(init.iter().all(|s| *s == 60), "secs: {secs}");
        }
    }

    #[test]
    fn test_segment_plan_truncates_sub_seconds() {
        let segments: Vec<_> =
            SegmentPlan::new(Duration::from_millis(61_999), DEFAULT_SEGMENT_LENGTH).collect();
        assert_eq!(segments, vec![60, 1]);

        let segments: Vec<_> =
            SegmentPlan::new(Duration::from_millis(999), DEFAULT_SEGMENT_LENGTH).collect();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_segment_plan_custom_length() {
        let segments: Vec<_> =
            SegmentPlan::new(Duration::from_secs(25), Duration::from_secs(10)).collect();
        assert_eq!(segments, vec![10, 10, 5]);

        // sub-second length is clamped to one second
        let segments: Vec<_> =
            SegmentPlan::new(Duration::from_secs(3), Duration::from_millis(10)).collect();
        assert_eq!(segments, vec![1, 1, 1]);
    }

    #[test]
    fn test_segment_plan_size_hint_and_remaining() {
        let mut plan = SegmentPlan::new(Duration::from_secs(150), DEFAULT_SEGMENT_LENGTH);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.next(), Some(60));
        assert_eq!(plan.remaining(), 90);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.next(), Some(60));
        assert_eq!(plan.next(), Some(30));
        assert_eq!(plan.remaining(), 0);
        assert_eq!(plan.len(), 0);
        assert_eq!(plan.next(), None);
    }
}
