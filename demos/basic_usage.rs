use aalen_hazards::{AalenFitter, SurvivalTable};
use ndarray::Array2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Aalen Additive Hazards Model - Basic Usage Example");
    println!("==================================================\n");

    // a small cohort: times, death indicator, and two covariates
    let table = SurvivalTable::new()
        .with_column(
            "time",
            vec![
                1.2, 2.1, 3.5, 4.2, 5.8, 6.1, 7.3, 8.9, 9.2, 10.5, 2.3, 3.1, 4.8, 5.2, 6.9, 7.1,
                8.3, 9.8, 10.1, 11.2,
            ],
        )?
        .with_column(
            "event",
            vec![
                1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0,
                1.0, 1.0, 0.0, 1.0,
            ],
        )?
        .with_column(
            "age",
            vec![
                65.0, 70.0, 55.0, 62.0, 68.0, 72.0, 58.0, 66.0, 71.0, 59.0, 63.0, 69.0, 57.0,
                64.0, 67.0, 73.0, 61.0, 65.0, 70.0, 56.0,
            ],
        )?
        .with_column(
            "treatment",
            vec![
                0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0,
                0.0, 1.0, 0.0, 1.0,
            ],
        )?;

    println!("Dataset Information:");
    println!("  - Number of subjects: {}", table.n_rows());
    println!("  - Columns: {:?}", table.names());
    println!();

    // Example 1: plain fit with a little regularization for stability
    println!("Example 1: Fitting");
    println!("------------------");

    let mut aaf = AalenFitter::new().with_coef_penalizer(0.5);
    aaf.fit(&table, "time", Some("event"), None, false)?;
    aaf.print_summary(4)?;
    println!();

    let report = aaf.report()?;
    println!(
        "Processed {}/{} event times ({} degenerate steps){}",
        report.steps_completed,
        report.unique_event_times,
        report.failures.len(),
        if report.stopped_early { ", stopped early" } else { "" },
    );
    println!();

    // Example 2: cumulative hazard curves for new subjects
    println!("Example 2: Predictions for New Subjects");
    println!("---------------------------------------");

    // columns in training order: age, treatment
    let new_subjects = Array2::from_shape_vec(
        (3, 2),
        vec![
            60.0, 0.0, // subject A: age 60, untreated
            75.0, 1.0, // subject B: age 75, treated
            52.0, 0.0, // subject C: age 52, untreated
        ],
    )?;

    let medians = aaf.predict_median(&new_subjects)?;
    let expectations = aaf.predict_expectation(&new_subjects)?;

    for i in 0..3 {
        println!(
            "  Subject {}: median lifetime = {:.2}, expected lifetime = {:.2}",
            (b'A' + i as u8) as char,
            medians[i],
            expectations[i]
        );
    }
    println!();

    // Example 3: survival curves over the observed timeline
    println!("Example 3: Survival Curves");
    println!("--------------------------");

    let survival = aaf.predict_survival_function(&new_subjects)?;
    let timeline = aaf.timeline()?;

    print!("time:      ");
    for &t in timeline.iter().take(6) {
        print!(" {:6.2}", t);
    }
    println!();
    for i in 0..3 {
        print!("subject {}: ", (b'A' + i as u8) as char);
        for j in 0..timeline.len().min(6) {
            print!(" {:6.3}", survival[[j, i]]);
        }
        println!();
    }
    println!();

    // Example 4: smoothing the raw hazard increments
    println!("Example 4: Smoothed Hazards");
    println!("---------------------------");

    let smoothed = aaf.smoothed_hazards(2.0)?;
    println!(
        "smoothed hazard matrix: {} time points x {} coefficients",
        smoothed.nrows(),
        smoothed.ncols()
    );
    println!();

    println!("Concordance = {:.4}", aaf.score()?);

    Ok(())
}
