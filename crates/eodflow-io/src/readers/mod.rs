//! Table readers.

pub mod csv;
