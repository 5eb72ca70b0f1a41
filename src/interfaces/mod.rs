//! Input and output formats used by the command-line binary.

pub mod csv;
