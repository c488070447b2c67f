// ABOUTME: Library root for hoist - compose project translation and build context packaging.
// ABOUTME: The CLI binary is in main.rs.

pub mod cancel;
pub mod compose;
pub mod context;
pub mod deploy;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod types;
pub mod upload;
