pub mod catalog;
pub mod classifier;
pub mod config;
pub mod describe;
pub mod domain;
pub mod emitter;
pub mod joins;
pub mod pipeline;
pub mod rules;
pub mod schema;
pub mod semantic_model;
pub mod synthesizer;
pub mod type_mapper;
pub mod views;

pub use pipeline::{GenerateError, GeneratedModel, Generator, GeneratorOptions};

#[cfg(test)]
mod tests;
