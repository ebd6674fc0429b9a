use std::process::ExitCode;

fn main() -> ExitCode {
    fixbid_cli::run()
}
