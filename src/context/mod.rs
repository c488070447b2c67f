// ABOUTME: Build context packaging: ignore rules, deterministic tar.gz and content digest.
// ABOUTME: Produces byte-identical archives for identical directory trees.

mod archive;
mod error;
mod ignore;
mod writer;

pub use archive::{Archive, package};
pub use error::{ContextError, ContextErrorKind};
pub use ignore::{IgnoreMatcher, read_patterns};

/// Compressed archives larger than this are rejected.
pub const MAX_CONTEXT_SIZE: usize = 10 * 1024 * 1024;

/// Modification time stamped on every entry (1980-01-01T00:00:00Z).
pub const SOURCE_DATE_EPOCH: u64 = 315_532_800;

/// Regular file count after which a warning is emitted once.
pub const LARGE_CONTEXT_FILES: usize = 10;

pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

pub const DOCKERIGNORE: &str = ".dockerignore";

/// Patterns used when the context carries no ignore file of its own.
pub const DEFAULT_DOCKERIGNORE: &str = "\
# Default .dockerignore file for hoist
**/.DS_Store
**/.direnv
**/.envrc
**/.git
**/.github
**/.idea
**/.next
**/.vscode
**/__pycache__
**/compose.yaml
**/compose.yml
**/docker-compose.yaml
**/docker-compose.yml
**/hoist.exe
**/node_modules
**/Thumbs.db
hoist
";
