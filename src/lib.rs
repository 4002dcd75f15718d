pub mod boundary;
pub mod capabilities;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod graph;
pub mod ranges;
pub mod release;
pub mod ui;

pub use error::{ReleaseError, Result};
