//! `timerqueue-sim` binary.

mod entrypoint;
mod sim;

fn main() {
    std::process::exit(entrypoint::run_from_env());
}
