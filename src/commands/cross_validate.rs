use super::initialize_thread_pool;
use crate::cli::CrossValidateArgs;
use crate::eval::{
    cross_validate as run_cross_validation, results_suffix, write_results_matrix,
    CrossValidationParams, ResultsMatrix,
};
use crate::hmm::Hmm;
use crate::utils::{create_writer, list_event_files, load_events, Result};
use std::time::Instant;

pub fn cross_validate(args: CrossValidateArgs) -> Result<()> {
    let start_timer = Instant::now();
    let model_kind = args.model_kind();
    let params = CrossValidationParams {
        folds: args.folds,
        cutoffs: args.cutoffs.0.clone(),
        seed: args.seed,
    };

    let paths = list_event_files(&args.events_dir)?;
    let events = load_events(&paths)?;
    log::info!(
        "Loaded {} events from {}",
        events.len(),
        args.events_dir.display()
    );

    let model_path = model_kind.path(&args.model_dir);
    let untrained = Hmm::read(&model_path)?;
    log::info!(
        "Untrained model {} with {} states from {}",
        untrained.name,
        untrained.num_states,
        model_path.display()
    );

    let pool = initialize_thread_pool(args.num_threads)?;
    let matrices = pool.install(|| run_cross_validation(&untrained, &events, &params))?;

    log::debug!("Results columns: {}", ResultsMatrix::header().join(","));
    for matrix in &matrices {
        let suffix = results_suffix(matrix);
        create_writer(&args.output_prefix, &suffix, |path| {
            log::debug!("Writing results for cutoff {} to {}", matrix.cutoff, path);
            write_results_matrix(path, matrix)
        })?;
    }

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}
