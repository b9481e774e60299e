//! Discovery: turning a module identifier into a tree of tests.
use std::collections::HashMap;

use crate::{errors::TrellisError, test::TestSuite};

pub mod toml;

/// Picker options. Recognised keys depend on the picker; an empty map means
/// defaults.
pub type Settings = HashMap<String, String>;

/// Builds the test tree for a module.
pub trait Discover {
    /// Return the root suite for `module`. Children carry full names
    /// qualified by the root's name.
    fn discover(
        &self,
        module: &str,
        settings: Option<&Settings>,
    ) -> Result<TestSuite, TrellisError>;
}
