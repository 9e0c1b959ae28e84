/*!
    Rational time bases and timestamp rescaling.
*/

use std::fmt;

/**
    A rational number, used for stream time bases and frame rates.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        The microsecond time base FFmpeg uses for container-level durations.
    */
    pub const MICROS: Self = Self::new(1, 1_000_000);

    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /**
        Returns true if the rational can be used as a time base.
    */
    pub fn is_valid(self) -> bool {
        self.num > 0 && self.den > 0
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/**
    Rescale a timestamp from one time base to another.

    Rounds to the nearest representable value, halfway cases away from zero,
    which matches FFmpeg's default rescaling behaviour.
*/
pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
    if from == to {
        return ts;
    }

    // ts * from.num / from.den * to.den / to.num
    let num = ts as i128 * from.num as i128 * to.den as i128;
    let den = from.den as i128 * to.num as i128;
    if den == 0 {
        return ts;
    }

    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let half = den / 2;
    let rounded = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bases_pass_through() {
        let tb = Rational::new(1, 90000);
        assert_eq!(rescale(123_456, tb, tb), 123_456);
    }

    #[test]
    fn rescale_between_video_bases() {
        // 1 second at 90kHz is 1 second at 1/15360
        assert_eq!(
            rescale(90000, Rational::new(1, 90000), Rational::new(1, 15360)),
            15360
        );
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        // 1/3 of a millisecond tick -> microseconds
        assert_eq!(rescale(1, Rational::new(1, 3000), Rational::MICROS), 333);
        assert_eq!(rescale(2, Rational::new(1, 3000), Rational::MICROS), 667);
        assert_eq!(rescale(-2, Rational::new(1, 3000), Rational::MICROS), -667);
    }

    #[test]
    fn rescale_audio_to_sample_base() {
        assert_eq!(
            rescale(1024, Rational::new(1, 8000), Rational::new(1, 16000)),
            2048
        );
    }

    #[test]
    fn validity() {
        assert!(Rational::new(1, 1000).is_valid());
        assert!(!Rational::new(0, 1).is_valid());
        assert!(!Rational::new(1, 0).is_valid());
        assert_eq!(Rational::new(0, 0).to_f64(), 0.0);
    }
}
