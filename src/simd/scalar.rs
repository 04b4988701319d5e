pub fn sum_f64(values: &[f64]) -> f64 {
    let mut sum = 0f64;
    for &v in values {
        sum += v;
    }
    sum
}

pub fn min_max_f64(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

pub fn squared_distance_f64(a: &[f64], b: &[f64]) -> f64 {
    let mut acc = 0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        acc += d * d;
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
    "scalar"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/scalar.rs"]
mod tests;
