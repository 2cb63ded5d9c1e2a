//! Table writers.

pub mod csv;
