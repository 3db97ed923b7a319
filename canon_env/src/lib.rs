#![deny(clippy::all)]
pub mod buffer;
pub mod memory;
pub mod stdio;
pub mod worker;
