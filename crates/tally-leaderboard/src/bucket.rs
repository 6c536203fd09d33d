//! Score histogram buckets.
//!
//! ```text
//! points == 0           → -1
//! 0 < points < 1 point  →  0
//! otherwise             →  floor(log2(whole points)) + 1
//! ```

use tally_math::whole_points;
use tally_types::ranking::EMPTY_BUCKET;

/// Bucket of a scaled (1e18) score.
pub fn bucket_for(points: u128) -> i32 {
    if points == 0 {
        return EMPTY_BUCKET;
    }
    let whole = whole_points(points);
    if whole == 0 {
        return 0;
    }
    whole.ilog2() as i32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_math::POINTS_SCALE;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket_for(0), -1);
        assert_eq!(bucket_for(1), 0);
        assert_eq!(bucket_for(POINTS_SCALE), 1);
        assert_eq!(bucket_for(2 * POINTS_SCALE), 2);
        assert_eq!(bucket_for(3 * POINTS_SCALE), 2);
        assert_eq!(bucket_for(4 * POINTS_SCALE), 3);
        assert_eq!(bucket_for(1_000 * POINTS_SCALE), 10);
    }
}
