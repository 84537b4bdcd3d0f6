//! Binary entrypoint for the Halldyll chat command line.

use std::process::ExitCode;

use halldyll_chat::start_halldyll_chat;

fn main() -> ExitCode {
    start_halldyll_chat::run()
}
