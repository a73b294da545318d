use crate::model::LinearFit;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Ordinary least-squares fit of `y = slope * x + intercept`.
///
/// The slope p-value is two-sided under H0: slope = 0, using Student's t
/// with `n - 2` degrees of freedom. Returns `None` for fewer than 3 points,
/// mismatched lengths or when every `x` is identical.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let syy: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    // constant y: no correlation, matching the usual convention
    let r_value = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let df = n - 2.0;
    let one_minus_r2 = (1.0 - r_value) * (1.0 + r_value);
    let (p_value, std_err) = if one_minus_r2 <= 0.0 {
        (0.0, 0.0)
    } else {
        let t = r_value * (df / one_minus_r2).sqrt();
        let std_err = (one_minus_r2 * syy / sxx / df).sqrt();
        (two_sided_p(t, df)?, std_err)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_value,
        r_squared: r_value * r_value,
        p_value,
        std_err,
    })
}

fn two_sided_p(t: f64, df: f64) -> Option<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_line() {
        let x = [10.0, 12.0, 14.0, 16.0, 18.0];
        let y = [0.0, 0.1, 0.2, 0.3, 0.4];
        let fit = linear_regression(&x, &y).unwrap();
        assert!((fit.slope - 0.05).abs() < 1e-12);
        assert!((fit.intercept + 0.5).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!(fit.p_value < 1e-6);
    }

    #[test]
    fn test_known_values() {
        // y = x with noise; reference values from a standard linregress
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert!((fit.slope - 0.6).abs() < 1e-12);
        assert!((fit.intercept - 2.2).abs() < 1e-12);
        assert!((fit.r_squared - 0.6).abs() < 1e-9);
        assert!((fit.p_value - 0.1240).abs() < 1e-3);
        assert!((fit.std_err - 0.2828).abs() < 1e-3);
    }

    #[test]
    fn test_flat_response() {
        let fit = linear_regression(&[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 0.0);
        assert!((fit.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(linear_regression(&[1.0, 2.0], &[1.0, 2.0]).is_none());
        assert!(linear_regression(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(linear_regression(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_none());
    }
}
