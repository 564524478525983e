// src/main.rs

use siteflow::{Outcome, cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("siteflow: {err:?}");
    }

    let code = match run(args).await {
        Ok(Outcome::Clean) => 0,
        Ok(Outcome::HadFailures) => 1,
        Err(err) if err.is_configuration() => {
            eprintln!("siteflow: configuration error: {err}");
            2
        }
        Err(err) => {
            eprintln!("siteflow error: {err}");
            1
        }
    };
    std::process::exit(code);
}
