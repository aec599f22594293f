//! CLI command handlers
//!
//! # Modules
//!
//! - `embed`: corpus to feature matrix artifact
//! - `vocab`: vocabulary construction from a corpus
//! - `inspect`: artifact summary

pub mod embed;
pub mod inspect;
pub mod vocab;
