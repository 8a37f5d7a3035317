//! Exact rational helpers for feed ratios.
//!
//! Ratios are kept as integer fractions end to end so table totals do not
//! depend on float rounding. Pi and the inch are rational approximations.

/// Pi as 355/113 (error below 1e-7).
pub const PI_NUM: u64 = 355;
pub const PI_DEN: u64 = 113;

/// Millimetres per inch as 127/5.
pub const MM_PER_INCH_NUM: u64 = 127;
pub const MM_PER_INCH_DEN: u64 = 5;

/// Greatest common divisor.
#[inline]
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// `num / den` rounded to nearest, ties up. `den` must be non-zero.
#[inline]
pub fn div_round_half_up(num: u64, den: u64) -> Option<u64> {
    debug_assert!(den != 0);
    num.checked_mul(2)?
        .checked_add(den)
        .map(|n| n / den.checked_mul(2).unwrap_or(u64::MAX))
}

/// `ceil(num / den)`.
#[inline]
pub fn div_ceil(num: u64, den: u64) -> u64 {
    num.div_ceil(den)
}

/// Parse a positive decimal such as `"11.5"` into a reduced fraction.
///
/// At most six fractional digits are accepted. Returns `None` for
/// malformed or zero values.
pub fn parse_decimal(s: &str) -> Option<(u64, u64)> {
    let s = s.trim();
    let (int, frac) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if (int.is_empty() && frac.is_empty()) || frac.len() > 6 || s.ends_with('.') {
        return None;
    }
    if !int.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut num: u64 = 0;
    for b in int.bytes().chain(frac.bytes()) {
        num = num.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
    }
    let den = 10u64.pow(frac.len() as u32);
    if num == 0 {
        return None;
    }
    let g = gcd(num, den);
    Some((num / g, den / g))
}
