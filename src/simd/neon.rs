#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

pub fn sum_f64(values: &[f64]) -> f64 {
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 2 <= n {
            let v = vld1q_f64(values.as_ptr().add(i));
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                sum += *lane;
            }
            i += 2;
        }
    }
    while i < n {
        sum += values[i];
        i += 1;
    }
    sum
}

pub fn min_max_f64(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 2 <= n {
            let v = vld1q_f64(values.as_ptr().add(i));
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), v);
            for &lane in &lanes {
                if lane < min {
                    min = lane;
                }
                if lane > max {
                    max = lane;
                }
            }
            i += 2;
        }
    }
    while i < n {
        let v = values[i];
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
        i += 1;
    }
    (min, max)
}

pub fn squared_distance_f64(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let mut acc = 0f64;
    let mut i = 0usize;
    unsafe {
        while i + 2 <= n {
            let va = vld1q_f64(a.as_ptr().add(i));
            let vb = vld1q_f64(b.as_ptr().add(i));
            let d = vsubq_f64(va, vb);
            let sq = vmulq_f64(d, d);
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), sq);
            for lane in &lanes {
                acc += *lane;
            }
            i += 2;
        }
    }
    while i < n {
        let d = a[i] - b[i];
        acc += d * d;
        i += 1;
    }
    acc
}

pub fn entropy_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum = sum_f64(values);
    if sum <= 0.0 {
        return 0.0;
    }
    let mut h = 0f64;
    for &v in values {
        let p = v / sum;
        if p > 0.0 {
            h -= p * p.ln();
        }
    }
    h
}

pub fn backend_name() -> &'static str {
    "neon"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/neon.rs"]
mod tests;
