//! 32.32 fixed-point rate and phase arithmetic.
//!
//! Based on the bandlimited-interpolation resampler design described at
//! <https://ccrma.stanford.edu/~jos/resample/>.

use crate::ZERO_CROSSINGS;

/// A resampling step expressed as a signed 32.32 fixed-point quantity: how
/// many input frames to advance per output frame. Always positive.
///
/// The bit pattern is a raw fixed-point encoding, not an arithmetic real —
/// callers should not add, subtract, or otherwise treat it as a plain
/// integer except through the helpers in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate(i64);

impl Rate {
    /// `rate == 1 << 32`: one input frame per output frame, i.e. no
    /// resampling. Callers may short-circuit to a direct copy when the
    /// computed rate equals this value.
    pub const IDENTITY: Rate = Rate(1 << 32);

    /// Builds a 32.32 fixed-point rate from two sample rates in Hz.
    ///
    /// # Panics (debug only)
    ///
    /// Panics in debug builds if either rate is zero.
    #[must_use]
    pub fn from_hz(src_rate: u32, dst_rate: u32) -> Self {
        debug_assert!(src_rate > 0, "src_rate must be positive");
        debug_assert!(dst_rate > 0, "dst_rate must be positive");
        let rate = (i64::from(src_rate) << 32) / i64::from(dst_rate);
        debug_assert!(rate > 0);
        Self(rate)
    }

    /// The raw 32.32 bit pattern.
    #[inline]
    #[must_use]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Whether this rate is the identity rate (`1 << 32`).
    #[inline]
    #[must_use]
    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }
}

/// Number of input frames that must exist immediately before the first live
/// input frame to supply every kernel's left-side taps, regardless of rate.
#[must_use]
pub fn history_frames() -> usize {
    ZERO_CROSSINGS + 1
}

/// Padding frames required for a given (possibly absent) resampling rate.
///
/// `None` means "identity passthrough, not resampling at all" and needs no
/// left padding; any active `Rate` needs [`history_frames`].
#[must_use]
pub fn padding_frames(rate: Option<Rate>) -> usize {
    if rate.is_some() { history_frames() } else { 0 }
}

/// `(b > 0) && (a > i64::MAX - b)` — the canonical saturating-add overflow
/// check. Negative operands are intentionally not guarded: callers only ever
/// pass values whose sign is already known.
#[inline]
fn checked_add(a: i64, b: i64) -> Option<i64> {
    if b > 0 && a > i64::MAX - b { None } else { Some(a + b) }
}

/// `(b > 0) && (a > i64::MAX / b)` — the canonical saturating-multiply
/// overflow check.
#[inline]
fn checked_mul(a: i64, b: i64) -> Option<i64> {
    if b > 0 && a > i64::MAX / b { None } else { Some(a * b) }
}

/// Number of "new" input frames (past the offset origin) that must be
/// supplied to produce `output_frames` outputs at the given `rate` starting
/// from `offset`.
///
/// Saturates to `i64::MAX` on overflow in either the multiply or the add;
/// clamps the final result to zero from below.
#[must_use]
pub fn input_frames_for(output_frames: i64, rate: Rate, offset: i64) -> i64 {
    let rate_raw = rate.raw();
    let output_offset = checked_mul(output_frames, rate_raw)
        .and_then(|product| checked_add(product, -rate_raw + offset + (1i64 << 32)));

    match output_offset {
        Some(output_offset) => (output_offset >> 32).max(0),
        None => i64::MAX,
    }
}

/// Number of output frames producible from `input_frames` input frames at
/// the given `rate`, updating `offset` in place to the residual expressed
/// relative to the next chunk's coordinate origin.
///
/// Saturates to `i64::MAX` on overflow in either arithmetic step; the
/// formula still behaves, producing the maximum number of output frames up
/// to the buffer's natural limit.
pub fn output_frames_for(input_frames: i64, rate: Rate, offset: &mut i64) -> i64 {
    let rate_raw = rate.raw();
    let resample_offset = *offset;

    let input_offset = checked_mul(input_frames, 1i64 << 32)
        .and_then(|product| checked_add(product, -resample_offset))
        .unwrap_or(i64::MAX);

    let output_frames = if input_offset > 0 { (input_offset - 1) / rate_raw + 1 } else { 0 };

    *offset = (output_frames * rate_raw) - input_offset;

    output_frames
}
