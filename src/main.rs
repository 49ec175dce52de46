use std::path::PathBuf;

use reel_feed::app::{self, RunOptions};

enum Action {
    Run(RunOptions),
    List(RunOptions),
    Exit,
}

fn main() {
    let action = match parse_args(std::env::args().skip(1)) {
        Ok(action) => action,
        Err(message) => {
            eprintln!("error: {message}\n\nRun with --help for usage.");
            std::process::exit(2);
        }
    };

    let result = match action {
        Action::Exit => return,
        Action::List(opts) => app::list(opts, &mut std::io::stdout().lock()),
        Action::Run(opts) => app::run_with(opts),
    };
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Action, String> {
    let mut opts = RunOptions::default();
    let mut list = false;
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Reel Feed {}", reel_feed::VERSION);
                return Ok(Action::Exit);
            }
            "--help" | "-h" => {
                println!(
                    "Reel Feed {} - Scroll sports celebrity history reels from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --list               Print the feed and exit\n  --config <path>      Read configuration from <path>",
                    reel_feed::VERSION
                );
                return Ok(Action::Exit);
            }
            "--list" => list = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config needs a path".to_string())?;
                opts.config_file = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(if list {
        Action::List(opts)
    } else {
        Action::Run(opts)
    })
}
