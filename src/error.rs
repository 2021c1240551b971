use thiserror::Error;

/// The sole recoverable error this crate can produce.
///
/// Every other operation is infallible on the hot path; preconditions such as
/// "both rates are positive" or "the frame index stays in range" are enforced
/// by debug assertions instead, per the crate's error-handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResampleError {
    #[error("unsupported channel count {0}; must be in 1..=8")]
    UnsupportedChannelCount(usize),
}
