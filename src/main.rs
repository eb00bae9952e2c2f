//! physrestore entry point
//!
//! A minimal entrypoint: parse arguments, dispatch through the CLI
//! module, and exit with the job's code. All logic lives behind
//! `cli::run`.

fn main() {
    std::process::exit(physrestore::cli::run());
}
