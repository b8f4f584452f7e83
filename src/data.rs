use log::warn;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{AalenError, Result};

/// column name reserved for the intercept term, the baseline hazard b_0(t)
pub const BASELINE_COLUMN: &str = "baseline";

/// tabular survival input - named f64 columns of equal length
///
/// Columns are stored in insertion order. The fitter pulls the duration,
/// event, and weights columns out by name; everything else is a covariate.
#[derive(Debug, Clone, Default)]
pub struct SurvivalTable {
    names: Vec<String>,
    columns: Vec<Array1<f64>>,
}

impl SurvivalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// append a named column, consuming and returning the table
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        if self.names.iter().any(|n| n == name) {
            return Err(AalenError::invalid_survival_data(format!(
                "column '{}' already exists",
                name
            )));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != values.len() {
                return Err(AalenError::invalid_dimensions(format!(
                    "column '{}' has {} rows, table has {}",
                    name,
                    values.len(),
                    first.len()
                )));
            }
        }
        self.names.push(name.to_string());
        self.columns.push(Array1::from(values));
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn n_columns(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].view())
    }
}

/// covariate input accepted by the prediction entry points
///
/// Tabular input is matched to the training columns by name, in any order;
/// raw matrices must carry the columns in training order. The intercept is
/// never part of the input - the fitter appends it.
pub trait Covariates {
    fn design_matrix(&self, order: &[String]) -> Result<Array2<f64>>;
}

impl Covariates for SurvivalTable {
    fn design_matrix(&self, order: &[String]) -> Result<Array2<f64>> {
        let mut design = Array2::zeros((self.n_rows(), order.len()));
        for (j, name) in order.iter().enumerate() {
            let col = self.column(name).ok_or_else(|| {
                AalenError::invalid_survival_data(format!(
                    "covariate column '{}' not found in table",
                    name
                ))
            })?;
            design.column_mut(j).assign(&col);
        }
        Ok(design)
    }
}

impl Covariates for Array2<f64> {
    fn design_matrix(&self, order: &[String]) -> Result<Array2<f64>> {
        self.view().design_matrix(order)
    }
}

impl Covariates for ArrayView2<'_, f64> {
    fn design_matrix(&self, order: &[String]) -> Result<Array2<f64>> {
        if self.ncols() != order.len() {
            return Err(AalenError::invalid_dimensions(format!(
                "covariate count mismatch: expected {}, got {}",
                order.len(),
                self.ncols()
            )));
        }
        Ok(self.to_owned())
    }
}

/// validated, duration-sorted arrays ready for fitting
#[derive(Debug, Clone)]
pub(crate) struct ObservationSet {
    pub covariates: Array2<f64>,
    pub columns: Vec<String>,
    pub durations: Array1<f64>,
    pub events: Vec<bool>,
    pub weights: Array1<f64>,
}

/// split a table into covariates/durations/events/weights, validate, and
/// stable-sort everything by duration ascending
pub(crate) fn preprocess(
    table: &SurvivalTable,
    duration_col: &str,
    event_col: Option<&str>,
    weights_col: Option<&str>,
    fit_intercept: bool,
) -> Result<ObservationSet> {
    let n = table.n_rows();
    if n == 0 {
        return Err(AalenError::invalid_survival_data("table has no rows"));
    }

    let durations = table.column(duration_col).ok_or_else(|| {
        AalenError::invalid_survival_data(format!("duration column '{}' not found", duration_col))
    })?;

    let events_raw = match event_col {
        Some(name) => Some(table.column(name).ok_or_else(|| {
            AalenError::invalid_survival_data(format!("event column '{}' not found", name))
        })?),
        // no event column means every subject's event was observed
        None => None,
    };

    let weights = match weights_col {
        Some(name) => {
            let w = table.column(name).ok_or_else(|| {
                AalenError::invalid_survival_data(format!("weights column '{}' not found", name))
            })?;
            if w.iter().any(|v| v.fract() != 0.0) {
                warn!(
                    "statistical warning: weights column '{}' is not integral, possibly \
                     propensity or sampling scores - the naive variance estimates of the \
                     coefficients are biased",
                    name
                );
            }
            if let Some(bad) = w.iter().find(|v| !(**v > 0.0)) {
                return Err(AalenError::invalid_parameter(
                    format!("weights column '{}'", name),
                    format!("{} (values must be strictly positive)", bad),
                ));
            }
            w.to_owned()
        }
        None => Array1::ones(n),
    };

    check_finite(duration_col, durations)?;
    if durations.iter().any(|t| *t < 0.0) {
        return Err(AalenError::invalid_survival_data(format!(
            "duration column '{}' contains negative values",
            duration_col
        )));
    }
    if let (Some(name), Some(e)) = (event_col, events_raw) {
        check_finite(name, e)?;
    }

    let special = [Some(duration_col), event_col, weights_col];
    let covariate_names: Vec<String> = table
        .names()
        .iter()
        .filter(|name| !special.iter().any(|s| *s == Some(name.as_str())))
        .cloned()
        .collect();

    for name in &covariate_names {
        // column() cannot miss here, the name came from the table itself
        if let Some(col) = table.column(name) {
            check_finite(name, col)?;
        }
    }

    if fit_intercept && covariate_names.iter().any(|n| n == BASELINE_COLUMN) {
        return Err(AalenError::invalid_parameter(
            "fit_intercept",
            format!(
                "'{}' is reserved for the intercept column, rename your column first",
                BASELINE_COLUMN
            ),
        ));
    }

    // stable sort keeps the original order of tied durations
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| durations[a].partial_cmp(&durations[b]).unwrap());

    let d = covariate_names.len() + usize::from(fit_intercept);
    let mut covariates = Array2::ones((n, d));
    for (j, name) in covariate_names.iter().enumerate() {
        if let Some(col) = table.column(name) {
            for (row, &src) in order.iter().enumerate() {
                covariates[[row, j]] = col[src];
            }
        }
    }

    let mut columns = covariate_names;
    if fit_intercept {
        columns.push(BASELINE_COLUMN.to_string());
    }

    let durations = Array1::from_iter(order.iter().map(|&i| durations[i]));
    let events: Vec<bool> = match events_raw {
        Some(e) => order.iter().map(|&i| e[i] != 0.0).collect(),
        None => vec![true; n],
    };
    let weights = Array1::from_iter(order.iter().map(|&i| weights[i]));

    Ok(ObservationSet {
        covariates,
        columns,
        durations,
        events,
        weights,
    })
}

fn check_finite(name: &str, values: ArrayView1<f64>) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AalenError::invalid_survival_data(format!(
            "column '{}' contains NaN or infinite values",
            name
        )));
    }
    Ok(())
}
