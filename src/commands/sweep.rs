use super::initialize_thread_pool;
use crate::cli::SweepArgs;
use crate::eval::{rolling_average, run_sweep, sweep_cutoffs, SweepParams, SweepSeries, SweepWriter};
use crate::utils::{create_writer, open_events_reader, read_ranked_events, Result};
use std::time::Instant;

pub fn sweep(args: SweepArgs) -> Result<()> {
    let start_timer = Instant::now();
    let params = SweepParams {
        steps: args.steps,
        window: args.window,
    };

    let reader = open_events_reader(&args.events_path)?;
    let events = read_ranked_events(reader)
        .map_err(|e| format!("{}: {}", args.events_path.display(), e))?;
    if events.is_empty() {
        return Err(format!("No events in {}", args.events_path.display()));
    }
    log::info!(
        "Loaded {} events from {}",
        events.len(),
        args.events_path.display()
    );

    let cutoffs = sweep_cutoffs(params.steps);
    let pool = initialize_thread_pool(args.num_threads)?;
    let series = pool.install(|| run_sweep(&events, &cutoffs));
    log_summary(&series);

    let single = rolling_average(&series.single(), params.window);
    let multi_best = rolling_average(&series.multi_best(), params.window);

    let mut writer = create_writer(&args.output_prefix, "sweep.csv", SweepWriter::new)?;
    writer.write(&series, &single, &multi_best)?;

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}

fn log_summary(series: &SweepSeries) {
    let describe = |v: Option<f64>| v.map_or("nan".to_string(), |v| format!("{:.3}", v));
    for point in series.points.iter().step_by((series.points.len() / 10).max(1)) {
        log::debug!(
            "Cutoff {:.3}: single={} ({}) multi_independent={} multi_best={} ({})",
            point.cutoff,
            describe(point.single),
            point.num_single,
            describe(point.multi_independent),
            describe(point.multi_best),
            point.num_multi
        );
    }
}
