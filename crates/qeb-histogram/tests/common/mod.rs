//! Shared utilities for integration tests

#![allow(dead_code)]

pub use approx::assert_relative_eq;

use std::io::Write;
use tempfile::NamedTempFile;

/// The five-row histogram file written by the sampler's quick test run
pub const FIVE_ROW_FILE: &str =
    "x\tp\terr\n0.0\t10\t1\n0.2\t20\t2\n0.4\t30\t3\n0.6\t40\t4\n0.8\t50\t5\n";

/// Write `contents` to a fresh temporary file
pub fn temp_file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
