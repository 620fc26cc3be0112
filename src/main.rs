//! ForReg: forensic registry analyser.
//!
//! Thin binary entry point. All logic lives in the `forreg-core` and
//! `forreg-cli` crates.

fn main() -> std::process::ExitCode {
    forreg_cli::main_entry()
}
