use std::process::ExitCode;

use flatfit_rs::cli;
use flatfit_rs::image_pipeline::FlatFieldPipeline;
use flatfit_rs::logger;

use tracing::{error, info};

fn main() -> ExitCode {
    let args = match cli::parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    logger::init();

    let invocation = match args.into_invocation() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", cli::usage());
            return ExitCode::from(e.exit_code());
        }
    };

    info!("Starting flatfit...");
    info!("Fit method: {:?}", invocation.config.fit_method);
    info!(
        "Channel solves: {}",
        if invocation.config.parallel_channels {
            "parallel"
        } else {
            "sequential"
        }
    );

    let pipeline = FlatFieldPipeline::new(invocation.config);

    match pipeline.convert_file(&invocation.input, &invocation.output) {
        Ok(format) => {
            info!("Wrote {} image to {}", format, invocation.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Correction failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
