// Entry point: one batch run, no arguments.
//
// Configuration comes from $REEF_REPORT_CONFIG or ./reef_report.json when
// present; log levels from RUST_LOG.
use reef_report::config::Config;
use reef_report::logging::{init_logging, LogFormat};
use reef_report::pipeline;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_logging(LogFormat::Pretty);
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(cfg.log_format);

    match pipeline::run(&cfg) {
        Ok(out) => {
            println!(
                "Processed {} projects; outputs saved to {}",
                out.lookup.len(),
                cfg.output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
