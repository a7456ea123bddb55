//! Park–Miller minimal standard generator.
//!
//! `x(n+1) = 48271 * x(n) mod (2^31 - 1)`
//!
//! The sequence is fully determined by the seed. Two generators with the same seed produce
//! the same values, which lets a receiver follow the hops, but there is no secrecy at all.

/// Modulus of the generator, the Mersenne prime 2^31 - 1.
pub const MODULUS: u32 = 2_147_483_647;
/// Multiplier of the generator.
pub const MULTIPLIER: u32 = 48_271;
/// Seed used when none is configured.
pub const DEFAULT_SEED: u32 = 123_456_789;

/// Generator state.
///
/// Not `Clone`: the state is owned by one user and only moves forward.
#[allow(missing_copy_implementations)]
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Creates a new generator.
    ///
    /// The state must lie in `1..MODULUS`. A seed outside that range is reduced modulo
    /// [`MODULUS`], and a seed that reduces to 0 (which would lock the generator at 0) is
    /// replaced by 1.
    pub const fn new(seed: u32) -> Self {
        let state = seed % MODULUS;
        Lcg {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Returns the current state without advancing.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advances the generator one step and returns the new state.
    ///
    /// The value lies in `1..=MODULUS - 1`.
    ///
    /// # Examples
    /// ```rust
    /// use spread_hop::lcg::Lcg;
    ///
    /// let mut lcg = Lcg::new(1);
    /// assert_eq!(lcg.next_value(), 48_271);
    /// ```
    pub fn next_value(&mut self) -> u32 {
        // The product needs 47 bits.
        let next = (u64::from(MULTIPLIER) * u64::from(self.state)) % u64::from(MODULUS);
        self.state = next as u32;
        self.state
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Iterator for Lcg {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_from_default_seed() {
        let expected = ((48_271u64 * 123_456_789u64) % 2_147_483_647u64) as u32;
        assert_eq!(expected, 115_541_394);
        assert_eq!(Lcg::default().next_value(), expected);
    }

    #[test]
    fn minimal_standard_check_value() {
        // Known value of the 48271 variant after 10000 steps from seed 1.
        let mut lcg = Lcg::new(1);
        let last = lcg.by_ref().take(10_000).last().unwrap();
        assert_eq!(last, 399_268_537);
    }

    #[test]
    fn same_seed_same_sequence() {
        let a: Vec<u32> = Lcg::new(42).take(1000).collect();
        let b: Vec<u32> = Lcg::new(42).take(1000).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn state_advances_every_call() {
        let mut lcg = Lcg::default();
        let mut prev = lcg.state();
        for _ in 0..1000 {
            let v = lcg.next_value();
            assert_ne!(v, prev);
            assert!(v >= 1 && v < MODULUS);
            prev = v;
        }
    }

    #[test]
    fn degenerate_seeds_are_normalised() {
        assert_eq!(Lcg::new(0).state(), 1);
        assert_eq!(Lcg::new(MODULUS).state(), 1);
        assert_eq!(Lcg::new(MODULUS + 5).state(), 5);
        assert_ne!(Lcg::new(0).next_value(), 0);
    }
}
