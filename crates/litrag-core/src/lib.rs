#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Shared domain types, collaborator contracts, errors and configuration for
//! the litrag retrieval workspace.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod metadata;
pub mod source;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
