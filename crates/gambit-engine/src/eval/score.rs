//! Packed middlegame/endgame score pair and phase tapering.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::eval::phase::PHASE_SCALE;

/// A middlegame and an endgame value packed into one `i32`.
///
/// The middlegame half lives in the upper 16 bits and the endgame half in
/// the lower 16 bits, so addition and subtraction work on the packed word
/// directly. Negation and scaling must unpack first.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Score(i32);

impl Score {
    pub const ZERO: Score = Score(0);

    #[inline]
    pub const fn new(mg: i16, eg: i16) -> Score {
        Score(((mg as i32) << 16).wrapping_add(eg as i32))
    }

    /// Middlegame half. The `0x8000` bias undoes the borrow a negative
    /// endgame half leaves in the upper word.
    #[inline]
    pub fn mg(self) -> i16 {
        (self.0.wrapping_add(0x8000) >> 16) as i16
    }

    /// Endgame half.
    #[inline]
    pub fn eg(self) -> i16 {
        self.0 as i16
    }

    /// Blend both halves by `phase` (0 = endgame, [`PHASE_SCALE`] = opening):
    /// `(mg * phase + eg * (256 - phase)) / 256`.
    #[inline]
    pub fn taper(self, phase: i32) -> i32 {
        let phase = phase.clamp(0, PHASE_SCALE);
        (i32::from(self.mg()) * phase + i32::from(self.eg()) * (PHASE_SCALE - phase)) / PHASE_SCALE
    }
}

/// `S(mg, eg)` shorthand used by the evaluation tables.
#[allow(non_snake_case)]
#[inline]
pub const fn S(mg: i16, eg: i16) -> Score {
    Score::new(mg, eg)
}

/// A phase-independent term: the same value in both halves.
#[inline]
pub const fn flat(v: i16) -> Score {
    Score::new(v, v)
}

// The halves are additive in the packed word, so these skip unpacking.
macro_rules! packed_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $trait for Score {
            type Output = Score;

            #[inline]
            fn $method(self, rhs: Score) -> Score {
                Score(self.0 $op rhs.0)
            }
        }

        impl $assign_trait for Score {
            #[inline]
            fn $assign_method(&mut self, rhs: Score) {
                *self = *self $op rhs;
            }
        }
    };
}

packed_op!(Add, add, AddAssign, add_assign, +);
packed_op!(Sub, sub, SubAssign, sub_assign, -);

impl Neg for Score {
    type Output = Score;

    #[inline]
    fn neg(self) -> Score {
        Score::new(-self.mg(), -self.eg())
    }
}

impl Mul<i16> for Score {
    type Output = Score;

    #[inline]
    fn mul(self, rhs: i16) -> Score {
        Score::new(self.mg() * rhs, self.eg() * rhs)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S({}, {})", self.mg(), self.eg())
    }
}

#[cfg(test)]
mod tests {
    use super::{S, Score, flat};

    #[test]
    fn halves_survive_packing() {
        for (mg, eg) in [(100, 200), (-50, -30), (100, -50), (-100, 50)] {
            let s = S(mg, eg);
            assert_eq!((s.mg(), s.eg()), (mg, eg), "packing {mg},{eg}");
        }
    }

    #[test]
    fn extremes_survive_packing() {
        let s = S(i16::MAX, i16::MIN);
        assert_eq!(s.mg(), i16::MAX);
        assert_eq!(s.eg(), i16::MIN);
        let s = S(i16::MIN, i16::MIN);
        assert_eq!(s.mg(), i16::MIN);
        assert_eq!(s.eg(), i16::MIN);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(S(10, 20) + S(30, -40), S(40, -20));
        assert_eq!(S(50, 60) - S(10, 20), S(40, 40));
        assert_eq!(-S(10, -20), S(-10, 20));
        assert_eq!(S(10, 20) * -2, S(-20, -40));
        let mut s = S(1, 2);
        s -= S(3, 4);
        assert_eq!(s, S(-2, -2));
    }

    #[test]
    fn taper_endpoints() {
        let s = S(80, 20);
        assert_eq!(s.taper(256), 80);
        assert_eq!(s.taper(0), 20);
        assert_eq!(s.taper(128), 50);
    }

    #[test]
    fn flat_terms_are_phase_independent() {
        for phase in [0, 64, 200, 256] {
            assert_eq!(flat(-37).taper(phase), -37);
        }
        assert_eq!(Score::ZERO.taper(100), 0);
    }
}
