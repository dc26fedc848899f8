use std::process::ExitCode;

use mimetic_operators::initialization::initialize_params_by_file;
use mimetic_operators::io::logger::init_logging;
use mimetic_operators::solver;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let param_file = args
        .next()
        .unwrap_or_else(|| "inputs/solverparam.json".to_string());
    let level = args.next();
    init_logging(level.as_deref());

    let summary = initialize_params_by_file(&param_file).and_then(|params| solver::run(&params));
    match summary {
        Ok(summary) => {
            match summary.rms_error {
                Some(rms) => log::info!(
                    "{} done after {} steps (t = {:.4}): rms error {:.4e}, range [{:.4e}, {:.4e}]",
                    summary.example,
                    summary.steps,
                    summary.final_time,
                    rms,
                    summary.min,
                    summary.max
                ),
                None => log::info!(
                    "{} done after {} steps (t = {:.4}): range [{:.4e}, {:.4e}]",
                    summary.example,
                    summary.steps,
                    summary.final_time,
                    summary.min,
                    summary.max
                ),
            }
            log::info!("output written to {}", summary.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{}: {}", param_file, err);
            ExitCode::FAILURE
        }
    }
}
