//! ftc utility - main entrypoint
// (c) 2025 Ross Younger

fn main() -> std::process::ExitCode {
    ftc::cli(std::env::args_os())
}
