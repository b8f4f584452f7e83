use std::time::{SystemTime, UNIX_EPOCH};

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::data::{preprocess, Covariates, SurvivalTable};
use crate::error::{AalenError, Result};
use crate::fitting::{fit_hazards, FitReport};
use crate::metrics::concordance_index;

// columns with (sample) standard deviation below this keep a unit scale
const MIN_STD: f64 = 1e-8;

/// Aalen's additive hazards model
///
/// The hazard rate is a linear function of the covariates with time-varying
/// coefficients, h(t|x) = b_0(t) + b_1(t) x_1 + ... + b_N(t) x_N. Fitting
/// estimates the cumulative coefficients B_i(t) by a sequence of ridge
/// regressions over the ordered event history.
#[derive(Debug, Clone)]
pub struct AalenFitter {
    fit_intercept: bool,
    alpha: f64,
    coef_penalizer: f64,
    smoothing_penalizer: f64,
    fitted: Option<FittedAalen>,
}

/// everything a fit produces, persistable as plain structured data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedAalen {
    /// covariate names in training order, the intercept column last
    pub columns: Vec<String>,
    /// unique event times actually processed, ascending
    pub timeline: Array1<f64>,
    /// per-step coefficient increments (timeline x columns)
    pub hazard_increments: Array2<f64>,
    /// column-wise running sums of the increments
    pub cumulative_hazards: Array2<f64>,
    /// column-wise running sums of the per-step variance contributions
    pub cumulative_variance: Array2<f64>,
    pub confidence_lower: Array2<f64>,
    pub confidence_upper: Array2<f64>,
    /// per-covariate sample standard deviation used during fitting
    pub norm_std: Array1<f64>,
    /// training durations, sorted ascending
    pub durations: Array1<f64>,
    pub event_observed: Vec<bool>,
    pub weights: Array1<f64>,
    pub n_examples: usize,
    /// unix seconds at the time fit() ran
    pub fitted_at_unix: u64,
    /// concordance of the fit, None when no pair of subjects is comparable
    pub concordance: Option<f64>,
    pub report: FitReport,
    pub duration_col: String,
    pub event_col: Option<String>,
    pub weights_col: Option<String>,
}

/// one row of the textual summary table
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub column: String,
    /// time-averaged coefficient, weighted by inverse cumulative variance
    pub avg_coef: f64,
    pub avg_lower: f64,
    pub avg_upper: f64,
}

impl Default for AalenFitter {
    fn default() -> Self {
        Self {
            fit_intercept: true,
            alpha: 0.95,
            coef_penalizer: 0.0,
            smoothing_penalizer: 0.0,
            fitted: None,
        }
    }
}

impl AalenFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// attach a constant column so b_0(t) acts as a baseline hazard
    /// (default true)
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// confidence level for the interval estimates, in (0, 1]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// L2 penalty on the coefficient magnitude - stabilizes the estimates
    /// when covariates are correlated or the risk set runs thin
    pub fn with_coef_penalizer(mut self, penalizer: f64) -> Self {
        self.coef_penalizer = penalizer;
        self
    }

    /// L2 penalty on the change between adjacent (over time) coefficients
    pub fn with_smoothing_penalizer(mut self, penalizer: f64) -> Self {
        self.smoothing_penalizer = penalizer;
        self
    }

    /// fit the model - this does the actual work
    ///
    /// `duration_col` names the lifetimes, `event_col` the death indicator
    /// (all events assumed observed when None), `weights_col` optional case
    /// weights. `show_progress` logs per-step elapsed time.
    pub fn fit(
        &mut self,
        table: &SurvivalTable,
        duration_col: &str,
        event_col: Option<&str>,
        weights_col: Option<&str>,
        show_progress: bool,
    ) -> Result<&mut Self> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(AalenError::invalid_parameter(
                "alpha",
                format!("{} (must be in (0, 1])", self.alpha),
            ));
        }
        if self.coef_penalizer < 0.0 || self.smoothing_penalizer < 0.0 {
            return Err(AalenError::invalid_parameter(
                "penalizer",
                "penalizer parameters must be >= 0",
            ));
        }

        let obs = preprocess(table, duration_col, event_col, weights_col, self.fit_intercept)?;

        // regress on standardized covariates so the penalties act on a
        // comparable scale; near-constant columns (the intercept included)
        // keep a unit scale
        let mut norm_std = obs.covariates.std_axis(Axis(0), 1.0);
        norm_std.mapv_inplace(|sd| if sd < MIN_STD { 1.0 } else { sd });
        let x_norm = &obs.covariates / &norm_std;

        let raw = fit_hazards(
            x_norm.view(),
            obs.durations.view(),
            &obs.events,
            self.coef_penalizer,
            self.smoothing_penalizer,
            show_progress,
        );

        let mut cumulative_hazards = raw.hazards.clone();
        cumulative_hazards.accumulate_axis_inplace(Axis(0), |&prev, cur| *cur += prev);
        let mut cumulative_variance = raw.variances;
        cumulative_variance.accumulate_axis_inplace(Axis(0), |&prev, cur| *cur += prev);

        // map the coefficients back to the original covariate scale; the
        // variance is rescaled the same way, matching the reference
        // implementation of this estimator
        let cumulative_hazards = cumulative_hazards / &norm_std;
        let cumulative_variance = cumulative_variance / &norm_std;
        let hazard_increments = raw.hazards / &norm_std;

        let z = Normal::new(0.0, 1.0)
            .map_err(|e| AalenError::numerical(e.to_string()))?
            .inverse_cdf(1.0 - (1.0 - self.alpha) / 2.0);
        let half_width = cumulative_variance.mapv(|v| z * v.sqrt());
        let confidence_lower = &cumulative_hazards - &half_width;
        let confidence_upper = &cumulative_hazards + &half_width;

        // predicted risk is the cumulative hazard at the end of the
        // timeline; scored once here, read back through score()
        let concordance = match cumulative_hazards.nrows() {
            0 => None,
            rows => {
                let predicted = obs.covariates.dot(&cumulative_hazards.row(rows - 1));
                concordance_index(predicted.view(), obs.durations.view(), &obs.events).ok()
            }
        };

        let fitted_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.fitted = Some(FittedAalen {
            columns: obs.columns,
            timeline: raw.timeline,
            hazard_increments,
            cumulative_hazards,
            cumulative_variance,
            confidence_lower,
            confidence_upper,
            norm_std,
            n_examples: obs.durations.len(),
            durations: obs.durations,
            event_observed: obs.events,
            weights: obs.weights,
            fitted_at_unix,
            concordance,
            report: raw.report,
            duration_col: duration_col.to_string(),
            event_col: event_col.map(str::to_string),
            weights_col: weights_col.map(str::to_string),
        });

        Ok(self)
    }

    fn state(&self) -> Result<&FittedAalen> {
        self.fitted.as_ref().ok_or(AalenError::ModelNotFitted)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// the full fitted state, e.g. for serialization
    pub fn fitted_state(&self) -> Result<&FittedAalen> {
        self.state()
    }

    pub fn cumulative_hazards(&self) -> Result<ArrayView2<'_, f64>> {
        Ok(self.state()?.cumulative_hazards.view())
    }

    pub fn cumulative_variance(&self) -> Result<ArrayView2<'_, f64>> {
        Ok(self.state()?.cumulative_variance.view())
    }

    pub fn hazard_increments(&self) -> Result<ArrayView2<'_, f64>> {
        Ok(self.state()?.hazard_increments.view())
    }

    /// (lower, upper) confidence bound matrices
    pub fn confidence_intervals(&self) -> Result<(ArrayView2<'_, f64>, ArrayView2<'_, f64>)> {
        let state = self.state()?;
        Ok((state.confidence_lower.view(), state.confidence_upper.view()))
    }

    pub fn timeline(&self) -> Result<ArrayView1<'_, f64>> {
        Ok(self.state()?.timeline.view())
    }

    pub fn columns(&self) -> Result<&[String]> {
        Ok(&self.state()?.columns)
    }

    pub fn report(&self) -> Result<&FitReport> {
        Ok(&self.state()?.report)
    }

    /// concordance of the fit, computed once during fit()
    pub fn score(&self) -> Result<f64> {
        self.state()?.concordance.ok_or_else(|| {
            AalenError::numerical("concordance is undefined for this fit - no comparable pairs")
        })
    }

    /// arrange new covariates to match training order and attach the
    /// intercept column
    fn design<C: Covariates + ?Sized>(&self, x: &C) -> Result<Array2<f64>> {
        let state = self.state()?;
        let d = state.columns.len();
        let user_columns = if self.fit_intercept {
            &state.columns[..d - 1]
        } else {
            &state.columns[..]
        };
        let m = x.design_matrix(user_columns)?;
        if !self.fit_intercept {
            return Ok(m);
        }
        let mut design = Array2::ones((m.nrows(), d));
        design.slice_mut(s![.., ..d - 1]).assign(&m);
        Ok(design)
    }

    /// individual cumulative hazard curves, timeline rows by subject columns
    pub fn predict_cumulative_hazard<C: Covariates + ?Sized>(&self, x: &C) -> Result<Array2<f64>> {
        let design = self.design(x)?;
        let state = self.state()?;
        Ok(state.cumulative_hazards.dot(&design.t()))
    }

    /// survival functions, exp(-cumulative hazard)
    pub fn predict_survival_function<C: Covariates + ?Sized>(&self, x: &C) -> Result<Array2<f64>> {
        Ok(self.predict_cumulative_hazard(x)?.mapv(|h| (-h).exp()))
    }

    /// the earliest time each survival curve drops to `p` or below
    /// (right-continuous step semantics, no interpolation); curves that
    /// never reach `p` report the end of the observed timeline, and an
    /// empty timeline reports NaN
    pub fn predict_percentile<C: Covariates + ?Sized>(&self, x: &C, p: f64) -> Result<Array1<f64>> {
        if !(0.0..=1.0).contains(&p) {
            return Err(AalenError::invalid_parameter(
                "p",
                format!("{} (must be in [0, 1])", p),
            ));
        }
        let survival = self.predict_survival_function(x)?;
        let state = self.state()?;
        let timeline = &state.timeline;

        let mut out = Array1::from_elem(survival.ncols(), f64::NAN);
        if timeline.is_empty() {
            return Ok(out);
        }
        for (subject, curve) in survival.columns().into_iter().enumerate() {
            let crossing = curve
                .iter()
                .position(|&sf| sf <= p)
                .unwrap_or(timeline.len() - 1);
            out[subject] = timeline[crossing];
        }
        Ok(out)
    }

    pub fn predict_median<C: Covariates + ?Sized>(&self, x: &C) -> Result<Array1<f64>> {
        self.predict_percentile(x, 0.5)
    }

    /// expected lifetime, the trapezoidal integral of each survival curve
    /// over the observed timeline
    ///
    /// Curves that have not decayed to zero by the last observed time make
    /// this a systematic underestimate of the true expectation.
    pub fn predict_expectation<C: Covariates + ?Sized>(&self, x: &C) -> Result<Array1<f64>> {
        let survival = self.predict_survival_function(x)?;
        let state = self.state()?;
        let timeline = &state.timeline;

        if timeline.is_empty() {
            return Ok(Array1::from_elem(survival.ncols(), f64::NAN));
        }
        let mut out = Array1::zeros(survival.ncols());
        for (subject, curve) in survival.columns().into_iter().enumerate() {
            let mut area = 0.0;
            for i in 1..timeline.len() {
                area += (timeline[i] - timeline[i - 1]) * (curve[i] + curve[i - 1]) / 2.0;
            }
            out[subject] = area;
        }
        Ok(out)
    }

    /// hazard increments smoothed over time with an Epanechnikov kernel of
    /// the given bandwidth
    pub fn smoothed_hazards(&self, bandwidth: f64) -> Result<Array2<f64>> {
        if !(bandwidth > 0.0) {
            return Err(AalenError::invalid_parameter(
                "bandwidth",
                format!("{} (must be > 0)", bandwidth),
            ));
        }
        let state = self.state()?;
        let timeline = &state.timeline;
        let steps = timeline.len();

        let mut kernel = Array2::zeros((steps, steps));
        for i in 0..steps {
            for j in 0..steps {
                let u = (timeline[i] - timeline[j]) / bandwidth;
                if u.abs() < 1.0 {
                    kernel[[i, j]] = 0.75 * (1.0 - u * u);
                }
            }
        }
        Ok(kernel.dot(&state.hazard_increments))
    }

    /// per-covariate time-averaged coefficients with confidence bounds,
    /// weighted by inverse cumulative variance
    pub fn summary(&self) -> Result<Vec<SummaryRow>> {
        let state = self.state()?;
        let mut rows = Vec::with_capacity(state.columns.len());
        for (j, name) in state.columns.iter().enumerate() {
            let mut weight_sum = 0.0;
            let (mut coef, mut lower, mut upper) = (0.0, 0.0, 0.0);
            for t in 0..state.timeline.len() {
                let w = 1.0 / state.cumulative_variance[[t, j]];
                weight_sum += w;
                coef += state.cumulative_hazards[[t, j]] * w;
                lower += state.confidence_lower[[t, j]] * w;
                upper += state.confidence_upper[[t, j]] * w;
            }
            rows.push(SummaryRow {
                column: name.clone(),
                avg_coef: coef / weight_sum,
                avg_lower: lower / weight_sum,
                avg_upper: upper / weight_sum,
            });
        }
        Ok(rows)
    }

    /// print dataset metadata, the summary table, and the concordance score
    pub fn print_summary(&self, decimals: usize) -> Result<()> {
        let state = self.state()?;
        let events = state.event_observed.iter().filter(|&&e| e).count();
        let censored = state.n_examples - events;

        println!(
            "<aalen_hazards.AalenFitter: fitted with {} observations, {} censored>",
            state.n_examples, censored
        );
        println!("{:<18} = '{}'", "duration col", state.duration_col);
        if let Some(event_col) = &state.event_col {
            println!("{:<18} = '{}'", "event col", event_col);
        }
        if let Some(weights_col) = &state.weights_col {
            println!("{:<18} = '{}'", "weights col", weights_col);
        }
        println!("{:<18} = {}", "number of subjects", state.n_examples);
        println!("{:<18} = {}", "number of events", events);
        println!("{:<18} = {} (unix)", "time fit was run", state.fitted_at_unix);
        println!();
        println!("---");

        println!(
            "{:<20} {:>14} {:>18} {:>18}",
            "",
            "avg(coef)",
            format!("avg(lower {:.2})", self.alpha),
            format!("avg(upper {:.2})", self.alpha)
        );
        for row in self.summary()? {
            println!(
                "{:<20} {:>14.prec$} {:>18.prec$} {:>18.prec$}",
                row.column,
                row.avg_coef,
                row.avg_lower,
                row.avg_upper,
                prec = decimals
            );
        }

        println!("---");
        match self.score() {
            Ok(score) => println!("Concordance = {:.prec$}", score, prec = decimals),
            Err(_) => println!("Concordance = n/a"),
        }
        Ok(())
    }
}
