use std::process::ExitCode;

fn main() -> ExitCode {
    pricescout::run()
}
