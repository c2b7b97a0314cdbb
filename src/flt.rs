//! ABI-stable scalar width selection.
//!
//! `FLT` is picked at compile time via the mutually exclusive `flt32`/`flt64`
//! features. The width is a stable property of the crate's public API, not
//! something callers can mix at runtime.

#[cfg(all(feature = "flt64", feature = "flt32"))]
compile_error!("enable exactly one of the `flt64` / `flt32` features");

#[cfg(not(any(feature = "flt64", feature = "flt32")))]
compile_error!("enable exactly one of the `flt64` / `flt32` features");

#[cfg(feature = "flt64")]
pub type FLT = f64;

#[cfg(feature = "flt32")]
pub type FLT = f32;

#[cfg(feature = "flt64")]
pub const EPSILON: FLT = 1e-9;

#[cfg(feature = "flt32")]
pub const EPSILON: FLT = 1e-5;

/// Standard gravity, m/s^2. Matches `RotateAccel`'s calibration constant.
pub const GRAVITY: FLT = 9.8066;
