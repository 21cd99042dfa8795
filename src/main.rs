use std::process::ExitCode;

fn main() -> ExitCode {
    meetmap_lib::run()
}
