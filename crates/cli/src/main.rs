use std::process::ExitCode;

fn main() -> ExitCode {
    carmatch_cli::run()
}
