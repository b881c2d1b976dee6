//! No-code Playwright core library.
//!
//! Compiles page, suite and step definitions into a Playwright project and
//! supervises runs of the generated tests, recording per-case results.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
