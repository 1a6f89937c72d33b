//! Commands - CLI Command Implementations
//!
//! This module contains the implementations for all CLI commands.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

pub mod list;
pub mod params;
pub mod range;

pub(crate) mod utils;
