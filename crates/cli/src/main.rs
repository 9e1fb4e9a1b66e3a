use std::process::ExitCode;

fn main() -> ExitCode {
    smartflow_cli::run()
}
