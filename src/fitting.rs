use std::time::Instant;

use log::{info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::solver::ridge_regression;

/// a step whose regression could not be solved; its hazard increment was
/// taken as zero and it contributed no variance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: usize,
    pub time: f64,
    pub reason: String,
}

/// per-fit accounting the caller can inspect after the fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    /// number of unique event times in the data
    pub unique_event_times: usize,
    /// steps actually processed before the small-risk-set rule halted
    pub steps_completed: usize,
    pub stopped_early: bool,
    pub failures: Vec<StepFailure>,
}

/// raw per-step output, before cumulative summation
pub(crate) struct RawHazards {
    pub timeline: Array1<f64>,
    pub hazards: Array2<f64>,
    pub variances: Array2<f64>,
    pub report: FitReport,
}

/// regress over the ordered event history
///
/// Walks the unique death times in ascending order; at each one, regresses
/// the death indicator on the covariates of the subjects still at risk
/// (ridge around the previous step's coefficients), then removes everyone
/// who exited at that time from the risk set. Halts once the risk set is
/// too small relative to the covariate count.
pub(crate) fn fit_hazards(
    x: ArrayView2<f64>,
    durations: ArrayView1<f64>,
    events: &[bool],
    coef_penalizer: f64,
    smoothing_penalizer: f64,
    show_progress: bool,
) -> RawHazards {
    let (n, d) = x.dim();

    // working copy of the risk set: exited subjects get their rows zeroed
    let mut x = x.to_owned();

    let mut unique_death_times: Vec<f64> = durations
        .iter()
        .zip(events.iter())
        .filter_map(|(&t, &e)| if e { Some(t) } else { None })
        .collect();
    unique_death_times.sort_by(|a, b| a.partial_cmp(b).unwrap());
    unique_death_times.dedup();

    let steps = unique_death_times.len();
    let mut hazards = Array2::zeros((steps, d));
    let mut variances = Array2::zeros((steps, d));
    let mut v = Array1::zeros(d);
    let mut total_observed_exits = 0usize;
    let mut completed = 0usize;
    let mut stopped_early = false;
    let mut failures = Vec::new();
    let start = Instant::now();

    for (i, &t) in unique_death_times.iter().enumerate() {
        let exits: Vec<bool> = durations.iter().map(|&ti| ti == t).collect();
        let deaths: Vec<bool> = exits
            .iter()
            .zip(events.iter())
            .map(|(&exit, &e)| exit && e)
            .collect();
        let y = Array1::from_iter(deaths.iter().map(|&died| f64::from(died as u8)));

        match ridge_regression(
            x.view(),
            y.view(),
            coef_penalizer,
            smoothing_penalizer,
            v.view(),
        ) {
            Ok(step) => {
                // per-covariate variance contribution: squared leverage of
                // every subject who died at this time
                for (col, var) in variances.row_mut(i).iter_mut().enumerate() {
                    *var = deaths
                        .iter()
                        .enumerate()
                        .filter(|&(_, &died)| died)
                        .map(|(subject, _)| step.hat[[col, subject]].powi(2))
                        .sum();
                }
                v = step.coef;
            }
            Err(err) => {
                warn!(
                    "convergence warning: regression failed at step index={}, time={:.3} ({}) \
                     - try increasing the coef_penalizer value",
                    i, t, err
                );
                v = Array1::zeros(d);
                failures.push(StepFailure {
                    step: i,
                    time: t,
                    reason: err.to_string(),
                });
            }
        }

        hazards.row_mut(i).assign(&v);

        // everyone who exited at this time leaves the risk set, deaths and
        // censorings alike
        for (subject, &exit) in exits.iter().enumerate() {
            if exit {
                x.row_mut(subject).fill(0.0);
            }
        }

        completed = i + 1;

        if show_progress {
            info!(
                "step {}/{}, seconds_since_start = {:.2}",
                i + 1,
                steps,
                start.elapsed().as_secs_f64()
            );
        }

        // halt once fewer than 3 * (d - 1) subjects remain, d not counting
        // the intercept; the factor 3 follows the R survival library. The
        // exits of the halting step itself are deliberately not counted.
        if 3 * d.saturating_sub(1) >= n - total_observed_exits {
            stopped_early = true;
            if show_progress {
                info!("stopping early, too few subjects remain in the tail");
            }
            break;
        }

        total_observed_exits += exits.iter().filter(|&&e| e).count();
    }

    RawHazards {
        timeline: Array1::from(unique_death_times[..completed].to_vec()),
        hazards: hazards.slice(s![..completed, ..]).to_owned(),
        variances: variances.slice(s![..completed, ..]).to_owned(),
        report: FitReport {
            unique_event_times: steps,
            steps_completed: completed,
            stopped_early,
            failures,
        },
    }
}
