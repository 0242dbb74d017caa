//! Utility modules.
//!
//! Corresponds to `crewai/utilities/`.

pub mod paths;
