use std::{error::Error, process::ExitCode};

use vulkan_bootstrap::{app, init_logging, BootstrapConfig, LoggingConfig};

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    match app::run(&BootstrapConfig::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            let mut source = err.source();
            while let Some(cause) = source {
                log::error!("  caused by: {cause}");
                source = cause.source();
            }

            ExitCode::FAILURE
        }
    }
}
