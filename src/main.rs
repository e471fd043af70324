use clap::Parser;
use dscan::{config, logging, Args, ScanEngine, ScanError};
use log::{error, info, LevelFilter};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let code = match run(&args).await {
        Ok(()) => 0,
        Err(e) => {
            if log::max_level() == LevelFilter::Off {
                // Failed before the log file was set up
                match logging::init_stderr_logger(args.log_level()) {
                    Ok(()) => error!("{}", e),
                    Err(_) => eprintln!("dscan: {}", e),
                }
            } else {
                error!("{}", e);
                eprintln!("dscan: {}", e);
            }
            e.exit_code()
        }
    };

    log::logger().flush();
    process::exit(code);
}

async fn run(args: &Args) -> Result<(), ScanError> {
    let config = config::load_config(args)?;
    logging::init_file_logger(&config.log_file, args.log_level())?;

    let engine = ScanEngine::new(config)?;
    let stats = engine.run().await?;

    info!(
        "Scan completed: {} records from {} domains written to indexes {}..={} in {:.2}s",
        stats.records_written,
        stats.domains_read,
        stats.first_index,
        stats.last_index,
        stats.duration.as_secs_f64()
    );

    Ok(())
}
