//! The outer resample loop: advances the phase accumulator, selects filter
//! rows, and dispatches to the per-channel-count kernel.

use crate::error::ResampleError;
use crate::fixed::Rate;
use crate::{filter, kernel, FILTER_INTERP_BITS, FILTER_INTERP_RANGE, TAPS_PER_FRAME, ZERO_CROSSINGS};

/// Forces construction of the filter bank and kernel dispatch table.
///
/// Calling this is optional — the first call to [`resample`] or to any
/// planning helper that touches the filter bank builds it implicitly — but
/// it lets a host pay the one-time construction cost predictably before the
/// first real-time use.
pub fn setup() {
    filter::force_build();
    kernel::force_build();

    if log::log_enabled!(log::Level::Debug) {
        let bank = filter::filter_bank();
        log::debug!(
            "resampler setup complete: {} filter coefficients, {ZERO_CROSSINGS} zero-crossings",
            bank.len()
        );
    }
}

/// Resamples `in_frames` live input frames into up to `out_frames` output
/// frames at the given `rate`, advancing `*offset` in place.
///
/// `src` holds [`history_frames`](crate::history_frames)` * channels` samples
/// of left padding, followed by `in_frames * channels` samples of live input,
/// followed by `ZERO_CROSSINGS * channels` samples of right-side lookahead.
/// The lookahead is required because a tap window centered near the last live
/// frame reads up to `ZERO_CROSSINGS` frames past it (the source's own tap
/// range is `-(ZERO_CROSSINGS - 1) < frame <= ZERO_CROSSINGS` relative to the
/// frame index being sampled); in a live stream those samples are simply the
/// start of whatever arrives next; at the true end of a stream the caller
/// pads with zeros. This lets the driver read both the left-side history taps
/// (including one frame of negative-index history) and the right-side
/// lookahead taps without any unsafe indexing. `dst` must hold at least
/// `out_frames * channels` samples.
///
/// `*offset` starts at `0` on a fresh stream and is threaded across calls
/// unmodified by the caller — only this function mutates it.
///
/// # Errors
///
/// Returns [`ResampleError::UnsupportedChannelCount`] if `channels` is `0` or
/// greater than `8`; this is the crate's only fallible entry point.
pub fn resample(
    channels: usize,
    src: &[f32],
    in_frames: usize,
    dst: &mut [f32],
    out_frames: usize,
    rate: Rate,
    offset: &mut i64,
) -> Result<(), ResampleError> {
    let kernel_fn = kernel::kernel_for(channels)?;
    debug_assert!(rate.raw() > 0, "rate must be positive");

    let bank = filter::filter_bank();

    // Absolute sample index of the first live frame within `src`.
    let live_origin = crate::fixed::history_frames() * channels;
    // Virtual left shift by (Z-1) frames so idx == 0 addresses the window
    // that includes the left wing of history.
    let window_origin = live_origin - (ZERO_CROSSINGS - 1) * channels;

    debug_assert!(
        src.len() >= live_origin + (in_frames + ZERO_CROSSINGS) * channels,
        "src must hold history_frames() + in_frames + ZERO_CROSSINGS frames of lookahead"
    );
    debug_assert!(dst.len() >= out_frames * channels);

    let rate_raw = rate.raw();
    let mut p = *offset;

    for frame in 0..out_frames {
        let idx = p >> 32;
        debug_assert!(
            idx >= -1 && idx < in_frames as i64,
            "idx {idx} out of range [-1, {in_frames})"
        );

        let frac = (p & 0xFFFF_FFFF) as u32;
        p += rate_raw;

        let row_index = (frac >> FILTER_INTERP_BITS) as usize;
        let alpha = (frac & (FILTER_INTERP_RANGE - 1)) as f32 / FILTER_INTERP_RANGE as f32;

        let window_start = (window_origin as i64 + idx * channels as i64) as usize;
        let window = &src[window_start..window_start + TAPS_PER_FRAME * channels];

        let f0 = bank.row(row_index);
        let f1 = bank.row(row_index + 1);

        let dst_start = frame * channels;
        kernel_fn(window, &mut dst[dst_start..dst_start + channels], f0, f1, alpha, channels);
    }

    *offset = p - ((in_frames as i64) << 32);

    Ok(())
}
