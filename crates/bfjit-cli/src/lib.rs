//! Command-line front end: argument parsing, the size-string parser, tape
//! construction, and the stdin/stdout runtime symbols a compiled program
//! calls into.

pub mod config;
pub mod error;
pub mod runtime;
pub mod sizestr;
pub mod tape;

pub use error::CliError;
