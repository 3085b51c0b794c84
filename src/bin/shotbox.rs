use std::process::ExitCode;

fn main() -> ExitCode {
    shotbox::cli::run()
}
