//! Core domain types for klaw: TODO annotations, remote issues and the
//! reconciliation between them.

pub mod annotation;
pub mod config;
pub mod error;
pub mod github;
pub mod issue;
pub mod reconcile;
pub mod rewrite;
pub mod track;
pub mod walker;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
