//! Two-sample distribution comparison.
//!
//! The sentiment view compares each conversation's per-period scores
//! against the rest of the corpus with a two-sample Kolmogorov–Smirnov
//! test. The statistic is the maximum distance between the two empirical
//! CDFs; the p-value uses the standard asymptotic approximation.

/// Result of a two-sample Kolmogorov–Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Maximum distance between the two empirical CDFs, in [0, 1].
    pub statistic: f64,
    /// Asymptotic two-sided p-value, in [0, 1].
    pub p_value: f64,
}

/// Two-sample Kolmogorov–Smirnov test.
///
/// Returns `None` when either sample is empty. The p-value approximation
/// is asymptotic and conservative for very small samples, which is
/// acceptable here: tiny samples are filtered out upstream by the
/// minimum-periods gate.
pub fn ks_2samp(sample: &[f64], population: &[f64]) -> Option<KsResult> {
    if sample.is_empty() || population.is_empty() {
        return None;
    }

    let mut a = sample.to_vec();
    let mut b = population.to_vec();
    a.sort_by(|x, y| x.total_cmp(y));
    b.sort_by(|x, y| x.total_cmp(y));

    let n1 = a.len() as f64;
    let n2 = b.len() as f64;

    // Walk both sorted samples, tracking the CDF gap
    let (mut i, mut j) = (0usize, 0usize);
    let mut statistic = 0.0f64;
    while i < a.len() && j < b.len() {
        let d1 = a[i];
        let d2 = b[j];
        if d1 <= d2 {
            i += 1;
        }
        if d2 <= d1 {
            j += 1;
        }
        let gap = (i as f64 / n1 - j as f64 / n2).abs();
        if gap > statistic {
            statistic = gap;
        }
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * statistic;
    let p_value = ks_significance(lambda);

    Some(KsResult { statistic, p_value })
}

/// Q_KS(λ) = 2 Σ_{j≥1} (-1)^{j-1} exp(-2 j² λ²), clamped to [0, 1].
fn ks_significance(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    let mut sum = 0.0f64;
    let mut sign = 1.0f64;
    let mut prev_term = 0.0f64;
    for j in 1..=100 {
        let term = (-2.0 * (j as f64).powi(2) * lambda.powi(2)).exp();
        sum += sign * term;
        if term <= 1e-12 || term <= prev_term * 1e-8 {
            break;
        }
        sign = -sign;
        prev_term = term;
    }

    (2.0 * sum).clamp(0.0, 1.0)
}
