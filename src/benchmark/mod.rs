// Benchmark harness module

pub mod harness;

pub use harness::*;
