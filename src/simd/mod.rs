#[inline]
pub fn sum_f64(values: &[f64]) -> f64 {
    backend::sum_f64(values)
}

#[inline]
pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum_f64(values) / values.len() as f64
}

/// Returns `(min, max)`; an empty slice yields `(+inf, -inf)`.
#[inline]
pub fn min_max_f64(values: &[f64]) -> (f64, f64) {
    backend::min_max_f64(values)
}

#[inline]
pub fn range_f64(values: &[f64]) -> f64 {
    let (min, max) = min_max_f64(values);
    if values.is_empty() { 0.0 } else { max - min }
}

#[inline]
pub fn euclidean_f64(a: &[f64], b: &[f64]) -> f64 {
    backend::squared_distance_f64(a, b).sqrt()
}

/// Shannon entropy (natural log) of `values` after normalising them to sum 1.
#[inline]
pub fn entropy_f64(values: &[f64]) -> f64 {
    backend::entropy_f64(values)
}

#[inline]
pub fn backend_name() -> &'static str {
    backend::backend_name()
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
mod backend {
    pub use crate::simd::avx2::*;
}

#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
mod backend {
    pub use crate::simd::neon::*;
}

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "avx2"),
    all(target_arch = "aarch64", target_feature = "neon"),
)))]
mod backend {
    pub use crate::simd::scalar::*;
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub mod avx2;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub mod neon;
pub mod scalar;

#[cfg(test)]
#[path = "../../tests/src_inline/simd/mod.rs"]
mod tests;
