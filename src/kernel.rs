//! Per-frame convolution kernels and their dispatch table.
//!
//! Every kernel implements the same contract: given a window `src` of `T`
//! consecutive frames of `channels` interleaved samples, two filter rows
//! `f0`/`f1` of `T` taps at adjacent phases, and a sub-phase weight `alpha`
//! in `[0, 1)`, write `channels` output samples to `dst` such that for each
//! channel `c`:
//!
//! ```text
//! dst[c] = sum_{i=0..T-1} src[i*channels + c] * ((1 - alpha)*f0[i] + alpha*f1[i])
//! ```

use crate::error::ResampleError;
use crate::TAPS_PER_FRAME;
use std::sync::LazyLock;

/// A dispatched per-frame convolution kernel. Safe: SIMD variants use only
/// intrinsics that are part of every x86_64 target's guaranteed baseline.
pub type KernelFn = fn(&[f32], &mut [f32], &[f32], &[f32], f32, usize);

fn resample_frame_mono(src: &[f32], dst: &mut [f32], f0: &[f32], f1: &[f32], alpha: f32, _channels: usize) {
    let mut out = 0.0f32;
    for i in 0..TAPS_PER_FRAME {
        let scale = f0[i] * (1.0 - alpha) + f1[i] * alpha;
        out += src[i] * scale;
    }
    dst[0] = out;
}

fn resample_frame_stereo(src: &[f32], dst: &mut [f32], f0: &[f32], f1: &[f32], alpha: f32, _channels: usize) {
    let mut out0 = 0.0f32;
    let mut out1 = 0.0f32;
    for i in 0..TAPS_PER_FRAME {
        let scale = f0[i] * (1.0 - alpha) + f1[i] * alpha;
        out0 += src[i * 2] * scale;
        out1 += src[i * 2 + 1] * scale;
    }
    dst[0] = out0;
    dst[1] = out1;
}

fn resample_frame_generic(src: &[f32], dst: &mut [f32], f0: &[f32], f1: &[f32], alpha: f32, channels: usize) {
    let mut scales = [0.0f32; TAPS_PER_FRAME];
    for (i, scale) in scales.iter_mut().enumerate() {
        *scale = f0[i] * (1.0 - alpha) + f1[i] * alpha;
    }

    for (c, out) in dst.iter_mut().enumerate().take(channels) {
        let mut sum = 0.0f32;
        for (i, &scale) in scales.iter().enumerate() {
            sum += src[i * channels + c] * scale;
        }
        *out = sum;
    }
}

#[cfg(target_arch = "x86_64")]
mod sse {
    use crate::TAPS_PER_FRAME;
    use std::arch::x86_64::{
        __m128, _mm_add_ps, _mm_loadu_ps, _mm_mul_ps, _mm_set1_ps, _mm_set_ps, _mm_setzero_ps,
        _mm_shuffle_ps, _mm_sub_ps, _mm_unpackhi_ps, _mm_unpacklo_ps,
    };

    #[inline]
    unsafe fn load_filter_row(row: &[f32]) -> (__m128, __m128, __m128) {
        let v0 = _mm_loadu_ps(row.as_ptr());
        let v1 = _mm_loadu_ps(row.as_ptr().add(4));
        let v2 = _mm_set_ps(0.0, 0.0, row[9], row[8]);
        (v0, v1, v2)
    }

    #[inline]
    unsafe fn blend(a: __m128, b: __m128, alpha: __m128, one_minus_alpha: __m128) -> __m128 {
        _mm_add_ps(_mm_mul_ps(a, one_minus_alpha), _mm_mul_ps(b, alpha))
    }

    #[inline]
    unsafe fn broadcast_lane(v: __m128, lane: usize) -> __m128 {
        match lane {
            0 => _mm_shuffle_ps(v, v, 0b00_00_00_00),
            1 => _mm_shuffle_ps(v, v, 0b01_01_01_01),
            2 => _mm_shuffle_ps(v, v, 0b10_10_10_10),
            _ => _mm_shuffle_ps(v, v, 0b11_11_11_11),
        }
    }

    /// SSE-accelerated kernel for any channel count 1..=8. Specialises the
    /// common mono/stereo cases, processes four channels at a time via
    /// broadcast shuffles for wider counts, and falls back to a scalar tail
    /// loop for the remaining 1-3 channels.
    pub(crate) fn resample_frame(
        src: &[f32],
        dst: &mut [f32],
        f0: &[f32],
        f1: &[f32],
        alpha: f32,
        channels: usize,
    ) {
        debug_assert_eq!(TAPS_PER_FRAME, 10, "SSE kernel assumes T == 10");

        // SAFETY: every intrinsic below belongs to SSE/SSE2, which is part of
        // the baseline every x86_64 target guarantees; `src`/`dst`/`f0`/`f1`
        // lengths are the caller's contract (T frames of `channels` samples,
        // T taps per filter row).
        unsafe {
            let alpha_v = _mm_set1_ps(alpha);
            let one_minus_alpha = _mm_sub_ps(_mm_set1_ps(1.0), alpha_v);

            let (a0, a1, a2) = load_filter_row(f0);
            let (b0, b1, b2) = load_filter_row(f1);
            let filters = [
                blend(a0, b0, alpha_v, one_minus_alpha),
                blend(a1, b1, alpha_v, one_minus_alpha),
                blend(a2, b2, alpha_v, one_minus_alpha),
            ];

            if channels == 1 {
                let s0 = _mm_loadu_ps(src.as_ptr());
                let s1 = _mm_loadu_ps(src.as_ptr().add(4));
                let s2 = _mm_set_ps(0.0, 0.0, src[9], src[8]);
                let mut acc = _mm_mul_ps(filters[0], s0);
                acc = _mm_add_ps(acc, _mm_mul_ps(filters[1], s1));
                acc = _mm_add_ps(acc, _mm_mul_ps(filters[2], s2));
                let lanes: [f32; 4] = std::mem::transmute(acc);
                dst[0] = lanes.iter().sum();
                return;
            }

            if channels == 2 {
                let f0_lo = _mm_unpacklo_ps(filters[0], filters[0]);
                let f0_hi = _mm_unpackhi_ps(filters[0], filters[0]);
                let f1_lo = _mm_unpacklo_ps(filters[1], filters[1]);
                let f1_hi = _mm_unpackhi_ps(filters[1], filters[1]);
                let f2_lo = _mm_unpacklo_ps(filters[2], filters[2]);

                let mut acc = _mm_mul_ps(_mm_loadu_ps(src.as_ptr()), f0_lo);
                acc = _mm_add_ps(acc, _mm_mul_ps(_mm_loadu_ps(src.as_ptr().add(4)), f0_hi));
                acc = _mm_add_ps(acc, _mm_mul_ps(_mm_loadu_ps(src.as_ptr().add(8)), f1_lo));
                acc = _mm_add_ps(acc, _mm_mul_ps(_mm_loadu_ps(src.as_ptr().add(12)), f1_hi));
                acc = _mm_add_ps(acc, _mm_mul_ps(_mm_loadu_ps(src.as_ptr().add(16)), f2_lo));

                let lanes: [f32; 4] = std::mem::transmute(acc);
                dst[0] = lanes[0] + lanes[2];
                dst[1] = lanes[1] + lanes[3];
                return;
            }

            // Used for the scalar tail below; cheap relative to the 4-wide path above.
            let blended: [f32; TAPS_PER_FRAME] = std::array::from_fn(|i| f0[i] * (1.0 - alpha) + f1[i] * alpha);

            let mut chan = 0;
            while chan + 4 <= channels {
                let mut acc = _mm_setzero_ps();
                for (tap, &filter_vec) in filters.iter().enumerate().flat_map(|(vi, &v)| {
                    (0..4).filter_map(move |lane| (vi * 4 + lane < TAPS_PER_FRAME).then_some((vi * 4 + lane, v)))
                }) {
                    let lane = tap % 4;
                    let in_vec = _mm_loadu_ps(src.as_ptr().add(chan + tap * channels));
                    acc = _mm_add_ps(acc, _mm_mul_ps(in_vec, broadcast_lane(filter_vec, lane)));
                }
                let lanes: [f32; 4] = std::mem::transmute(acc);
                dst[chan..chan + 4].copy_from_slice(&lanes);
                chan += 4;
            }

            for c in chan..channels {
                let mut out = 0.0f32;
                for (tap, &scale) in blended.iter().enumerate() {
                    out += src[tap * channels + c] * scale;
                }
                dst[c] = out;
            }
        }
    }
}

struct KernelTable {
    kernels: [KernelFn; 8],
}

impl KernelTable {
    fn scalar() -> Self {
        let mut kernels: [KernelFn; 8] = [resample_frame_generic; 8];
        kernels[0] = resample_frame_mono;
        kernels[1] = resample_frame_stereo;
        Self { kernels }
    }

    #[cfg(target_arch = "x86_64")]
    fn sse() -> Self {
        Self { kernels: [sse::resample_frame; 8] }
    }

    fn build() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("sse") {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("resampler: SSE kernel selected");
                }
                return Self::sse();
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("resampler: scalar kernel selected");
        }
        Self::scalar()
    }

    fn get(&self, channels: usize) -> Option<KernelFn> {
        if channels == 0 || channels > self.kernels.len() {
            None
        } else {
            Some(self.kernels[channels - 1])
        }
    }
}

static KERNEL_TABLE: LazyLock<KernelTable> = LazyLock::new(KernelTable::build);

/// Resolves the kernel to use for the given channel count. Resolution happens
/// once (the table itself is built once, lazily); this call is just an
/// indexed lookup, never a CPU-feature probe.
pub fn kernel_for(channels: usize) -> Result<KernelFn, ResampleError> {
    KERNEL_TABLE.get(channels).ok_or(ResampleError::UnsupportedChannelCount(channels))
}

/// Forces construction of the kernel dispatch table if it hasn't been built yet.
pub fn force_build() {
    LazyLock::force(&KERNEL_TABLE);
}
