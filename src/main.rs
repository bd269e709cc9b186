use clap::Parser;
use wheeler::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
