use ndarray::ArrayView1;

use crate::error::{AalenError, Result};

/// concordance index - how often does higher predicted risk mean shorter
/// survival?
///
/// Pairs are comparable when the earlier time belongs to an observed event;
/// ties in predicted risk count half. 0.5 is random, 1.0 is perfect.
pub fn concordance_index(
    risk_scores: ArrayView1<f64>,
    times: ArrayView1<f64>,
    events: &[bool],
) -> Result<f64> {
    let n = risk_scores.len();
    if n != times.len() || n != events.len() {
        return Err(AalenError::invalid_dimensions(
            "risk scores, times, and events must have same length",
        ));
    }
    if n < 2 {
        return Err(AalenError::invalid_dimensions(
            "need at least 2 subjects for concordance",
        ));
    }

    let mut concordant = 0.0;
    let mut comparable = 0.0;

    for i in 0..n {
        if !events[i] {
            continue; // censored subjects don't anchor a comparison
        }

        for j in 0..n {
            if i == j {
                continue;
            }

            // j is comparable to i if j outlived i (event or censored)
            if times[j] > times[i] || (!events[j] && times[j] >= times[i]) {
                comparable += 1.0;

                if risk_scores[i] > risk_scores[j] {
                    concordant += 1.0;
                } else if risk_scores[i] == risk_scores[j] {
                    concordant += 0.5;
                }
            }
        }
    }

    if comparable == 0.0 {
        return Err(AalenError::numerical(
            "no comparable pairs for concordance calc",
        ));
    }

    Ok(concordant / comparable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn test_perfect_concordance() {
        let times = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let events = vec![true, true, true, true];
        // risk perfectly anti-correlated with survival time
        let risk = Array1::from(vec![4.0, 3.0, 2.0, 1.0]);

        let c = concordance_index(risk.view(), times.view(), &events).unwrap();
        assert_relative_eq!(c, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reversed_concordance() {
        let times = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let events = vec![true, true, true, true];
        let risk = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);

        let c = concordance_index(risk.view(), times.view(), &events).unwrap();
        assert_relative_eq!(c, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tied_risk_counts_half() {
        let times = Array1::from(vec![1.0, 2.0]);
        let events = vec![true, true];
        let risk = Array1::from(vec![0.7, 0.7]);

        let c = concordance_index(risk.view(), times.view(), &events).unwrap();
        assert_relative_eq!(c, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_censored_subjects_do_not_anchor() {
        let times = Array1::from(vec![1.0, 2.0, 3.0]);
        let events = vec![false, false, true];
        let risk = Array1::from(vec![0.1, 0.2, 0.9]);

        // only the event at t=3.0 could anchor, and nobody outlived it
        assert!(concordance_index(risk.view(), times.view(), &events).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let times = Array1::from(vec![1.0, 2.0, 3.0]);
        let events = vec![true, false];
        let risk = Array1::from(vec![1.0, 2.0]);

        assert!(concordance_index(risk.view(), times.view(), &events).is_err());
    }
}
