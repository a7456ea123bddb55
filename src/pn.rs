//! The pseudo-noise spreading code.

use crate::PN_SEQUENCE_LENGTH;

/// A single element of the spreading code.
///
/// The code uses on/off chips, so spreading with [`Chip::Zero`] blanks the sample.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Chip {
    /// Chip value 0
    Zero = 0,
    /// Chip value 1
    One = 1,
}

impl Chip {
    /// Returns the chip as a spreading factor.
    pub fn factor(&self) -> f32 {
        match self {
            Chip::Zero => 0.0,
            Chip::One => 1.0,
        }
    }
}

impl From<Chip> for u8 {
    fn from(c: Chip) -> Self {
        c as u8
    }
}

use Chip::{One, Zero};

/// The spreading code shared by transmitter and receiver.
pub const PN_SEQUENCE: PnSequence = PnSequence([
    One, Zero, Zero, One, One, Zero, One, One, One, Zero, Zero,
]);

/// A fixed chip sequence, indexed cyclically against the samples of a signal.
///
/// There is no way to mutate the chips once constructed.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PnSequence([Chip; PN_SEQUENCE_LENGTH]);

impl PnSequence {
    /// Creates a sequence from its chips.
    pub const fn new(chips: [Chip; PN_SEQUENCE_LENGTH]) -> Self {
        PnSequence(chips)
    }

    /// Returns the chips.
    pub fn chips(&self) -> &[Chip; PN_SEQUENCE_LENGTH] {
        &self.0
    }

    /// Returns the chip applied to the sample at `index`.
    pub fn chip(&self, index: usize) -> Chip {
        self.0[index % PN_SEQUENCE_LENGTH]
    }

    /// Spreads a single sample at position `index` of the signal.
    pub fn spread_sample(&self, index: usize, sample: f32) -> f32 {
        sample * self.chip(index).factor()
    }

    /// Returns an iterator over the spread samples of `signal`.
    ///
    /// # Examples
    /// ```rust
    /// use spread_hop::pn::PN_SEQUENCE;
    ///
    /// let spread: Vec<f32> = PN_SEQUENCE.spread(&[2.0, 2.0, 2.0]).collect();
    /// assert_eq!(spread, [2.0, 0.0, 0.0]);
    /// ```
    pub fn spread<'a>(&'a self, signal: &'a [f32]) -> impl Iterator<Item = f32> + 'a {
        signal
            .iter()
            .enumerate()
            .map(move |(i, &s)| self.spread_sample(i, s))
    }
}

impl Default for PnSequence {
    fn default() -> Self {
        PN_SEQUENCE
    }
}
