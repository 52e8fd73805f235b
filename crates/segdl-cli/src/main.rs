use clap::Parser;
use segdl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Initialize logging as early as possible; a broken log path must not
    // take the whole run down.
    if args.no_logging {
        logging::init_logging_stderr(args.verbose);
    } else if let Err(err) = logging::init_logging(args.log_path.as_deref(), args.verbose) {
        eprintln!("segdl: file logging unavailable ({err:#}); logging to stderr");
        logging::init_logging_stderr(args.verbose);
    }

    if let Err(err) = cli::run(args).await {
        eprintln!("segdl error: {err:#}");
        std::process::exit(1);
    }
}
