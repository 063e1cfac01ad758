use std::process::ExitCode;

fn main() -> ExitCode {
    fusion_cli::run()
}
