//! Builders to construct the engine from configuration.

pub mod engine_builder;

pub use engine_builder::{build_engine, build_engine_from_env, build_engine_from_json, Engine};
