// src/core/mod.rs

//! The scan engine. `scanner` holds the pipeline stages, `signatures` the
//! pattern and vendor registries, `models` the report data model.

pub mod error;
pub mod models;
pub mod scanner;
pub mod signatures;
