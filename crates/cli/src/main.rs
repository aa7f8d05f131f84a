use std::process::ExitCode;

fn main() -> ExitCode {
    manpower_cli::run()
}
