//! Fixed-point decimal arithmetic
//!
//! Scorer writes scores as decimal strings ("55.00", "36") and USEBIO expects
//! them back the same way. [`Decimal`] keeps the number of fractional digits
//! it was parsed with, so values round-trip without floating point artifacts.
//! All rounding is half-even.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Most fractional digits a [`Decimal`] carries. Rescaling any two values
/// to a common scale then always fits in an `i128`.
const MAX_SCALE: u32 = 18;

/// A decimal number stored as `mantissa * 10^-scale`
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal {
    mantissa: i64,
    scale: u32,
}

/// Error returned when a string is not a plain decimal number
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid decimal: {0:?}")]
pub struct ParseDecimalError(String);

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    /// `scale` must not exceed 18
    pub const fn new(mantissa: i64, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    pub fn from_int(value: i64) -> Self {
        Self::new(value, 0)
    }

    /// `numer / denom` rounded to `dp` decimal places, or `None` for a zero
    /// denominator or a result out of range.
    pub fn from_ratio(numer: i64, denom: i64, dp: u32) -> Option<Self> {
        Self::from_wide_ratio(i128::from(numer), i128::from(denom), dp)
    }

    fn from_wide_ratio(numer: i128, denom: i128, dp: u32) -> Option<Self> {
        if denom == 0 || dp > MAX_SCALE {
            return None;
        }
        let (numer, denom) = if denom < 0 {
            (-numer, -denom)
        } else {
            (numer, denom)
        };
        let mantissa = div_half_even(numer.checked_mul(pow10(dp))?, denom);
        Some(Self::new(narrow(mantissa)?, dp))
    }

    /// `self` as a percentage of `whole`, to 2 decimal places
    pub fn percent_of(self, whole: i64) -> Option<Self> {
        Self::from_wide_ratio(
            i128::from(self.mantissa) * 100,
            i128::from(whole) * pow10(self.scale),
            2,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn abs(self) -> Self {
        Self::new(self.mantissa.saturating_abs(), self.scale)
    }

    /// Drop trailing fractional zeros: `3.60` becomes `3.6`, `3.0` becomes `3`.
    pub fn normalize(self) -> Self {
        let mut value = self;
        while value.scale > 0 && value.mantissa % 10 == 0 {
            value.mantissa /= 10;
            value.scale -= 1;
        }
        value
    }

    /// Exact division by `10^places`, normalized. `None` when the result
    /// would need more than 18 fractional digits.
    pub fn shift_right(self, places: u32) -> Option<Self> {
        let value = self.normalize();
        let scale = value.scale.checked_add(places).filter(|s| *s <= MAX_SCALE)?;
        Some(Self::new(value.mantissa, scale).normalize())
    }

    /// Round (or pad) to exactly `dp` decimal places.
    pub fn round_dp(self, dp: u32) -> Option<Self> {
        if dp > MAX_SCALE {
            return None;
        }
        let mantissa = i128::from(self.mantissa);
        let mantissa = if dp >= self.scale {
            mantissa * pow10(dp - self.scale)
        } else {
            div_half_even(mantissa, pow10(self.scale - dp))
        };
        Some(Self::new(narrow(mantissa)?, dp))
    }

    /// Round to the nearest integer.
    pub fn round_to_int(self) -> Option<i64> {
        self.round_dp(0).map(|value| value.mantissa)
    }

    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        let scale = self.scale.max(rhs.scale);
        let sum = self.rescaled(scale) + rhs.rescaled(scale);
        Some(Self::new(narrow(sum)?, scale))
    }

    pub fn checked_sub(self, rhs: Decimal) -> Option<Decimal> {
        let scale = self.scale.max(rhs.scale);
        let difference = self.rescaled(scale) - rhs.rescaled(scale);
        Some(Self::new(narrow(difference)?, scale))
    }

    /// True when `self` is an exact multiple of `step`.
    pub fn is_multiple_of(self, step: Decimal) -> bool {
        let scale = self.scale.max(step.scale);
        let step = step.rescaled(scale);
        step != 0 && self.rescaled(scale) % step == 0
    }

    fn rescaled(&self, scale: u32) -> i128 {
        i128::from(self.mantissa) * pow10(scale - self.scale)
    }
}

fn pow10(exp: u32) -> i128 {
    10i128.pow(exp)
}

fn narrow(value: i128) -> Option<i64> {
    i64::try_from(value).ok()
}

fn div_half_even(numer: i128, denom: i128) -> i128 {
    let negative = numer < 0;
    let numer = numer.abs();
    let quotient = numer / denom;
    let twice_remainder = (numer % denom) * 2;
    let rounded = match twice_remainder.cmp(&denom) {
        Ordering::Greater => quotient + 1,
        Ordering::Equal => quotient + (quotient & 1),
        Ordering::Less => quotient,
    };
    if negative {
        -rounded
    } else {
        rounded
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(s.to_string());
        let text = s.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(invalid());
        }
        if frac.len() > MAX_SCALE as usize {
            return Err(invalid());
        }

        let digits = format!("{}{}", whole, frac);
        let magnitude: i64 = digits.parse().map_err(|_| invalid())?;
        let mantissa = if negative { -magnitude } else { magnitude };
        Ok(Self::new(mantissa, frac.len() as u32))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let magnitude = self.mantissa.unsigned_abs();
        let unit = 10u64.pow(self.scale);
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / unit,
            magnitude % unit,
            width = self.scale as usize
        )
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.rescaled(scale).cmp(&other.rescaled(scale))
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}
