// src/main.rs

use wgo::errors::CliError;
use wgo::{cli, logging};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() <= 1 {
        print!("{}", cli::HELP);
        return;
    }

    logging::init();

    match wgo::run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            if let Some(usage) = err
                .downcast_ref::<CliError>()
                .and_then(CliError::help_text)
            {
                print!("{usage}");
                return;
            }
            eprintln!("wgo: {err}");
            std::process::exit(1);
        }
    }
}
