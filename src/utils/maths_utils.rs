use argminmax::ArgMinMax;

pub fn get_max(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let max_index: usize = vec.argmax();
    Some(vec[max_index])
}

pub fn get_min(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let min_index: usize = vec.argmin();
    Some(vec[min_index])
}

/// Arithmetic mean. Empty input gives 0.0.
// Used to aggregate timeframe confidences. A weighted or min-based aggregate
// would slot in here.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// True if the closed intervals [a_low, a_high] and [b_low, b_high] share any price.
/// Bounds may be supplied in either order.
pub fn ranges_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    let (a_low, a_high) = if a.0 <= a.1 { a } else { (a.1, a.0) };
    let (b_low, b_high) = if b.0 <= b.1 { b } else { (b.1, b.0) };
    a_low <= b_high && b_low <= a_high
}

/// Relative difference |a - b| / |b|, guarded against b == 0
pub fn relative_diff(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return (a - b).abs();
    }
    ((a - b) / b).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_handles_empty() {
        assert_eq!(get_max(&[]), None);
        assert_eq!(get_min(&[1.5, -2.0, 3.0]), Some(-2.0));
        assert_eq!(get_max(&[1.5, -2.0, 3.0]), Some(3.0));
    }

    #[test]
    fn test_mean() {
        assert!((mean(&[0.8, 0.75]) - 0.775).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_ranges_overlap_either_order() {
        assert!(ranges_overlap((1.0, 2.0), (1.5, 3.0)));
        assert!(ranges_overlap((2.0, 1.0), (3.0, 2.0)));
        assert!(!ranges_overlap((1.0, 2.0), (2.1, 3.0)));
    }
}
