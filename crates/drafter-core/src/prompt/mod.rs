//! Prompt templates and safe placeholder substitution.

mod materialize;
pub mod templates;

pub use materialize::{materialize, placeholders, Bindings};
