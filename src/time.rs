//! Tick counters, deadlines and durations
//!
//! Time is an unsigned tick counter that wraps. A deadline is an absolute
//! value on that same counter. Because the counter wraps, a deadline is only
//! meaningful within half the counter range either side of "now":
//!
//! * `deadline` has passed if `now - deadline` (mod 2^W) is in `0..=2^(W-1)`
//! * otherwise it lies in the future
//!
//! Durations are written as exact fractions of a second ([`Ratio`]) and
//! converted to ticks by rounding up, so a delay is never shorter than asked.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// An unsigned, wrapping tick counter
///
/// Implemented for `u8`, `u16`, `u32` and `u64`. The width sets how far
/// ahead a deadline may be.
pub trait TickCount: Copy + Eq + Ord + core::fmt::Debug + 'static {
    /// Zero ticks
    const ZERO: Self;
    /// One tick
    const ONE: Self;
    /// Half the counter range, `2^(W-1)`
    const HALF: Self;

    /// Add, wrapping at the counter width
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Subtract, wrapping at the counter width
    fn wrapping_sub(self, rhs: Self) -> Self;

    /// Convert from a wide tick count, keeping the low bits
    fn truncate(ticks: u64) -> Self;

    /// Widen to a `u64`
    fn widen(self) -> u64;

    /// Has `deadline` already passed, at time `self`?
    #[inline]
    fn has_passed(self, deadline: Self) -> bool {
        self.wrapping_sub(deadline) <= Self::HALF
    }

    /// The deadline `ticks` whole ticks from now
    ///
    /// Adds one more tick, because we are part-way through the current
    /// tick period and the remainder is unknown.
    #[inline]
    fn deadline_after(self, ticks: Self) -> Self {
        self.wrapping_add(ticks).wrapping_add(Self::ONE)
    }

    /// How many ticks from `self` until `deadline`
    #[inline]
    fn ticks_until(self, deadline: Self) -> Self {
        deadline.wrapping_sub(self)
    }
}

macro_rules! impl_tick_count {
    ($($t:ty),+) => {
        $(
            impl TickCount for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const HALF: Self = 1 << (<$t>::BITS - 1);

                #[inline]
                fn wrapping_add(self, rhs: Self) -> Self {
                    <$t>::wrapping_add(self, rhs)
                }

                #[inline]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$t>::wrapping_sub(self, rhs)
                }

                #[inline]
                fn truncate(ticks: u64) -> Self {
                    ticks as $t
                }

                #[inline]
                fn widen(self) -> u64 {
                    self as u64
                }
            }
        )+
    };
}

impl_tick_count!(u8, u16, u32, u64);

/// An exact, non-negative fraction - a number of seconds
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ratio {
    num: u64,
    /// Never zero
    den: u64,
}

impl Ratio {
    /// Make a new ratio, `num / den`
    pub const fn new(num: u64, den: u64) -> Ratio {
        assert!(den != 0, "Ratio with zero denominator");
        Ratio { num, den }
    }

    /// The tick period for a tick rate in Hertz
    pub const fn from_hz(hz: u64) -> Ratio {
        Ratio::new(1, hz)
    }

    /// The numerator
    pub const fn num(&self) -> u64 {
        self.num
    }

    /// The denominator, which is never zero
    pub const fn den(&self) -> u64 {
        self.den
    }
}

/// `n` seconds
pub const fn secs(n: u64) -> Ratio {
    Ratio::new(n, 1)
}

/// `n` milliseconds
pub const fn millis(n: u64) -> Ratio {
    Ratio::new(n, 1_000)
}

/// `n` microseconds
pub const fn micros(n: u64) -> Ratio {
    Ratio::new(n, 1_000_000)
}

/// Convert a duration into a whole number of ticks of length `period`
///
/// Rounds up, so that `ticks_from(d, p) * p >= d` always holds. Works in
/// `const` contexts:
///
/// ```
/// use pets::time::{ticks_from, millis, Ratio};
/// const PERIOD: Ratio = Ratio::from_hz(1000);
/// const HUNDRED_MS: u64 = ticks_from(millis(100), PERIOD);
/// assert_eq!(HUNDRED_MS, 100);
/// ```
pub const fn ticks_from(duration: Ratio, period: Ratio) -> u64 {
    assert!(period.num != 0, "Tick period cannot be zero");
    // duration / period = (d.num * p.den) / (d.den * p.num)
    let num = duration.num as u128 * period.den as u128;
    let den = duration.den as u128 * period.num as u128;
    let ticks = num.div_ceil(den);
    assert!(ticks <= u64::MAX as u128, "Duration too long for the tick counter");
    ticks as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_window_at_wraparound() {
        let now: u8 = 250;
        // 5 is eleven ticks in the future
        assert!(!now.has_passed(5));
        assert_eq!(now.ticks_until(5), 11);
        // 240 was ten ticks ago
        assert!(now.has_passed(240));
        // now itself counts as passed
        assert!(now.has_passed(250));
        assert!(!now.has_passed(251));
    }

    #[test]
    fn half_window_edges() {
        let now: u8 = 0;
        // exactly half a range behind is still the past
        assert!(now.has_passed(128));
        // 129 is 127 ticks behind
        assert!(now.has_passed(129));
        // 127 is 127 ticks ahead
        assert!(!now.has_passed(127));
        assert!(!now.has_passed(1));
        let now: u32 = 0x8000_0000;
        assert!(now.has_passed(0));
        assert!(!now.has_passed(0xFFFF_FFFF));
    }

    #[test]
    fn relative_deadlines_add_one() {
        assert_eq!(10u32.deadline_after(5), 16);
        assert_eq!(250u8.deadline_after(10), 5);
        assert_eq!(u16::MAX.deadline_after(0), 0);
    }

    #[test]
    fn ticks_round_up() {
        let khz = Ratio::from_hz(1000);
        assert_eq!(ticks_from(millis(100), khz), 100);
        assert_eq!(ticks_from(micros(1500), khz), 2);
        assert_eq!(ticks_from(micros(1), khz), 1);
        assert_eq!(ticks_from(secs(0), khz), 0);
        // 32.768 kHz crystal: 1 ms is 32.768 ticks
        assert_eq!(ticks_from(millis(1), Ratio::from_hz(32_768)), 33);
        // a 10 ms tick
        assert_eq!(ticks_from(millis(25), Ratio::new(1, 100)), 3);
        assert_eq!(ticks_from(secs(2), Ratio::new(1, 100)), 200);
    }

    #[test]
    fn ratio_accessors() {
        let period = Ratio::from_hz(32_768);
        assert_eq!(period.num(), 1);
        assert_eq!(period.den(), 32_768);
        assert_eq!(millis(250), Ratio::new(250, 1_000));
    }

    #[test]
    #[should_panic(expected = "Ratio with zero denominator")]
    fn zero_denominator_is_rejected() {
        let _ = Ratio::new(1, 0);
    }

    #[test]
    fn truncation_keeps_low_bits() {
        assert_eq!(<u8 as TickCount>::truncate(0x1_05), 5);
        assert_eq!(<u16 as TickCount>::HALF, 0x8000);
        assert_eq!(300u16.widen(), 300);
    }
}

// End of File
