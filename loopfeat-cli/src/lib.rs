//! loopfeat-cli library
//!
//! Command implementations for the `loopfeat` binary.

pub mod commands;
