/// Ascending copy of `values`, ordered with `f64::total_cmp`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_unstable_by(f64::total_cmp);
    out
}

/// Linear interpolation between `a` and `b`.
///
/// Anchors on the nearer endpoint so `t == 0` yields `a` and `t == 1` yields
/// `b` exactly, and the result stays monotonic in `t`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// `(min, max)` of `values`, or `None` when empty.
pub fn extrema(values: &[f64]) -> Option<(f64, f64)> {
    let (&first, rest) = values.split_first()?;
    Some(rest.iter().fold((first, first), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    }))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squared deviations from `center`.
pub fn sum_sq_dev(values: &[f64], center: f64) -> f64 {
    values.iter().map(|&v| (v - center) * (v - center)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints_exact() {
        assert_eq!(lerp(10.0, 30.0, 0.0), 10.0);
        assert_eq!(lerp(10.0, 30.0, 1.0), 30.0);
        assert_eq!(lerp(10.0, 30.0, 0.5), 20.0);
        assert_eq!(lerp(10.0, 30.0, 0.25), 15.0);
        assert_eq!(lerp(10.0, 30.0, 0.75), 25.0);
    }

    #[test]
    fn test_extrema_and_mean() {
        assert_eq!(extrema(&[]), None);
        assert_eq!(extrema(&[3.0, -1.0, 8.0]), Some((-1.0, 8.0)));
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_sorted_leaves_input_alone() {
        let input = [3.0, 1.0, 2.0];
        assert_eq!(sorted(&input), vec![1.0, 2.0, 3.0]);
        assert_eq!(input, [3.0, 1.0, 2.0]);
    }
}
