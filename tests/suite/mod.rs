//! Integration test modules

mod capture_cycle;
mod cli;
