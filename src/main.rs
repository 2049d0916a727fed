//! Spritestack - command-line tool for compositing layered character sprites

use std::process::ExitCode;

use spritestack::cli;

fn main() -> ExitCode {
    cli::run()
}
