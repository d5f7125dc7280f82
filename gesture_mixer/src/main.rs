//! gesture_mixer — command-line entry point.

use gesture_mixer::app::{mode_description, run};
use gesture_mixer::cli::{parse_args, Command, USAGE};
use gesture_mixer::config::resolve_config;
use gesture_mixer::error::AppError;
use gesture_mixer::status::print_banner;

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(AppError::from(e).exit_code());
        }
    };

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    print_banner(mode_description());

    let outcome = resolve_config(args.config.as_deref()).and_then(|config| run(&args, config));
    match outcome {
        Ok(reason) => std::process::exit(reason.exit_code()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
