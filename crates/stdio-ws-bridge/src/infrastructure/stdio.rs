//! Process stdio handles.
//!
//! Stdout carries frames and nothing else; logs go to stderr (see
//! `main.rs`).  Tokio reads stdin on a blocking thread that cannot be
//! interrupted, so the binary ends with `std::process::exit` instead of
//! waiting for the runtime to drop that thread.

use tokio::io::{BufReader, Stdin, Stdout};

/// Buffered stdin, ready for line reads.
pub fn local_input() -> BufReader<Stdin> {
    BufReader::new(tokio::io::stdin())
}

/// Raw stdout; the controller flushes after every frame.
pub fn local_output() -> Stdout {
    tokio::io::stdout()
}
