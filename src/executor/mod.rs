//! The executor walks a test tree, runs every node and builds the results.

pub mod command;
mod context;
pub mod results;
mod work;

pub use context::{CaseScope, ExecutionContext};
pub use work::execute;
