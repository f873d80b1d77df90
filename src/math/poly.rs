//! Polynomial helpers.
//!
//! The operating-point equation of a source-degenerated stage is a quadratic in
//! `vgs`. With `rs = 0` the leading coefficient vanishes and it degenerates to
//! a linear equation, which `quadratic_roots` handles explicitly.

/// Real roots of `a x² + b x + c`, in ascending order.
///
/// - `a == 0` falls back to the linear root `-c / b` (none if `b == 0`)
/// - a negative discriminant yields no roots
/// - a zero discriminant yields a single (double) root
pub fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || !disc.is_finite() {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }

    // Citardauq form avoids cancellation when b² ≫ 4ac.
    let sq = disc.sqrt();
    let q = -0.5 * (b + b.signum() * sq);
    let mut roots = if q == 0.0 {
        vec![sq / (2.0 * a), -sq / (2.0 * a)]
    } else {
        vec![q / a, c / q]
    };
    roots.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    roots
}

/// `n` evenly spaced samples over `[start, stop]` (inclusive).
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
