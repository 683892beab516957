//! Quantity arithmetic shared by the reallocator and the cost cascade.

/// Round half up, for non-negative quantities.
///
/// All proportional reductions in this system round half up so results are
/// deterministic and testable (3 parts at proportion 2/3 leaves exactly 1).
pub fn round_half_up(value: f64) -> f64 {
    debug_assert!(value >= 0.0, "quantities are never negative");
    (value + 0.5).floor()
}

/// `round_half_up` narrowed to integer count quantities.
pub fn round_half_up_u32(value: f64) -> u32 {
    round_half_up(value) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_round_up() {
        assert_eq!(round_half_up(0.5), 1.0);
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(2.4999), 2.0);
        assert_eq!(round_half_up(0.0), 0.0);
    }

    #[test]
    fn proportional_reduction_matches_the_reference_split() {
        // 60 units, 2 of 3 instances attended: 1/3 remains.
        let remaining = round_half_up(60.0 * (1.0 - 2.0 / 3.0));
        assert_eq!(remaining, 20.0);
        assert_eq!(round_half_up_u32(3.0 * (1.0 - 2.0 / 3.0)), 1);
    }
}
