//! # aalen additive hazards regression
//!
//! Aalen's additive model - survival analysis with time-varying coefficients
//!
//! The hazard rate is modeled as a linear function of the covariates,
//! h(t|x) = b_0(t) + b_1(t) x_1 + ... + b_N(t) x_N, with the coefficients
//! free to change over time. Fitting runs one small ridge regression per
//! unique death time, walking the event history in order and shrinking the
//! risk set as subjects die or are censored.
//!
//! ## what you get
//!
//! - cumulative hazard coefficients with variance and confidence intervals
//! - optional L2 penalties on coefficient size and on their change over time
//! - survival curves, median/percentile lifetimes, expected lifetimes
//! - concordance scoring and a textual summary of the fit
//!
//! ## quick start
//!
//! ```rust
//! use aalen_hazards::{AalenFitter, SurvivalTable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = SurvivalTable::new()
//!     .with_column("T", vec![5.0, 3.0, 9.0, 8.0, 7.0, 4.0, 4.0, 3.0, 2.0, 5.0, 6.0, 7.0])?
//!     .with_column("E", vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0])?
//!     .with_column("var", vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0])?;
//!
//! let mut aaf = AalenFitter::new().with_coef_penalizer(0.5);
//! aaf.fit(&table, "T", Some("E"), None, false)?;
//!
//! let medians = aaf.predict_median(&table)?;
//! assert_eq!(medians.len(), 12);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod fitting;
pub mod metrics;
pub mod model;
mod solver;

pub use data::{Covariates, SurvivalTable, BASELINE_COLUMN};
pub use error::{AalenError, Result};
pub use fitting::{FitReport, StepFailure};
pub use model::{AalenFitter, FittedAalen, SummaryRow};
