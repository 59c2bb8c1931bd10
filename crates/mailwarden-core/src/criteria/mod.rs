//! Search-criteria compilation.
//!
//! Turns a profile's free-text phrase into a server-side filter expression
//! with approximate multi-word matching.

mod compiler;
mod filter;

pub use compiler::compile;
pub use filter::FilterExpr;
