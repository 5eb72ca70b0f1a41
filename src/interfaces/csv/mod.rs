pub mod session_reader;
pub mod summary_writer;
