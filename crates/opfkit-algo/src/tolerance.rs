//! Fixed numeric tolerances.
//!
//! Near-zero and near-equal comparisons never use `==` on computed values. Every
//! threshold used by the sensitivity engine and the security-constrained models is
//! defined here.

/// PTDF entries with `|v| <= PTDF_ZERO_TOL` are stored as exactly zero.
pub const PTDF_ZERO_TOL: f64 = 1e-13;

/// Relative tolerance of [`is_close`].
pub const CLOSE_RTOL: f64 = 1e-5;

/// Absolute tolerance of [`is_close`].
pub const CLOSE_ATOL: f64 = 1e-8;

/// Bounds at or beyond this magnitude are treated as absent by solver backends.
pub const INFINITE_BOUND: f64 = 1e10;

/// `|a - b| <= atol + rtol·|b|` with rtol 1e-5 and atol 1e-8.
///
/// Asymmetric in its arguments: `b` is the reference value. Used for bridge
/// detection (`PTDF_OO ≈ 1`), rating comparisons and zero-capacity generators.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= CLOSE_ATOL + CLOSE_RTOL * b.abs()
}

/// Bound magnitude that a backend should treat as finite.
pub fn is_finite_bound(value: f64) -> bool {
    value.is_finite() && value.abs() < INFINITE_BOUND
}
