use slog::crit;
use std::process::exit;
use validator_watcher::{cli, logger, service};

fn main() {
    let matches = cli::app().get_matches();

    let config = match cli::parse_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1)
        }
    };

    let log = match logger::async_logger(&config.debug_level, config.log_format.as_deref()) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Unable to start logger: {}", e);
            exit(1)
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            crit!(log, "Unable to start runtime"; "error" => %e);
            drop(log);
            exit(1)
        }
    };

    let result = runtime.block_on(service::run(config, log.clone()));

    // `std::process::exit` does not run destructors so we drop manually. The runtime goes first
    // as its tasks hold clones of the logger.
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            crit!(log, "Validator watcher failed"; "error" => ?e);
            1
        }
    };
    drop(runtime);
    drop(log);

    exit(code)
}
