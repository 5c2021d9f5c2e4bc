use crate::v4l2::videodev::v4l2_fract;
use std::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Fraction used for timing settings and aspect ratios
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Fraction {
    /// Returns a fraction representation
    ///
    /// # Arguments
    ///
    /// * `num` - Numerator
    /// * `denom` - Denominator
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::fraction::Fraction;
    /// let frac = Fraction::new(30, 1);
    /// ```
    pub const fn new(num: u32, denom: u32) -> Self {
        Fraction {
            numerator: num,
            denominator: denom,
        }
    }

    /// Reduces `num / denom` to lowest terms, scaling down when a term does not fit in 32 bits
    pub fn reduced(num: u64, denom: u64) -> Self {
        let g = gcd(num, denom).max(1);
        let (mut num, mut denom) = (num / g, denom / g);
        while num > u32::MAX as u64 || denom > u32::MAX as u64 {
            num >>= 1;
            denom >>= 1;
        }
        Fraction::new(num as u32, denom.max(1) as u32)
    }

    /// The value as floating point, zero for an empty denominator
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Swaps numerator and denominator, turning a frame interval into a frame rate
    pub fn inverse(&self) -> Self {
        Fraction::new(self.denominator, self.numerator)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<v4l2_fract> for Fraction {
    fn from(frac: v4l2_fract) -> Self {
        Self {
            numerator: frac.numerator,
            denominator: frac.denominator,
        }
    }
}

impl From<Fraction> for v4l2_fract {
    fn from(fraction: Fraction) -> Self {
        Self {
            numerator: fraction.numerator,
            denominator: fraction.denominator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce() {
        assert_eq!(Fraction::reduced(30_000_000, 1_000_000), Fraction::new(30, 1));
        assert_eq!(Fraction::reduced(29_970_000, 1_000_000), Fraction::new(2997, 100));
        assert_eq!(Fraction::reduced(0, 5), Fraction::new(0, 1));
    }

    #[test]
    fn reduce_large_terms() {
        let frac = Fraction::reduced(1 << 40, 1 << 20);
        assert_eq!(frac, Fraction::new(1 << 20, 1));
    }

    #[test]
    fn interval_to_rate() {
        let rate = Fraction::new(1, 25).inverse();
        assert_eq!(rate.as_f64(), 25.0);
        assert_eq!(Fraction::new(1, 0).as_f64(), 0.0);
    }
}
