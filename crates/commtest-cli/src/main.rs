#![forbid(unsafe_code)]

fn main() -> std::process::ExitCode {
    commtest_cli::main_entry()
}
