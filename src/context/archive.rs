// ABOUTME: Deterministic build context archiver.
// ABOUTME: Walks the context in lexical order and streams a gzipped tar through a digest tee.

use bytes::Bytes;
use flate2::{Compression, GzBuilder};
use snafu::{ResultExt, ensure};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header, HeaderMode};
use walkdir::WalkDir;

use super::error::{
    CancelledSnafu, ContextError, ContextNotFoundSnafu, DockerfileNotFoundSnafu, IoSnafu,
    SizeLimitSnafu, WalkSnafu,
};
use super::ignore::{IgnoreMatcher, clean, read_patterns};
use super::writer::{
    CancelAwareWriter, CappedBuffer, HashingWriter, is_cancelled, is_limit_exceeded,
};
use super::{
    DEFAULT_DOCKERFILE, DEFAULT_DOCKERIGNORE, DOCKERIGNORE, LARGE_CONTEXT_FILES, MAX_CONTEXT_SIZE,
    SOURCE_DATE_EPOCH,
};
use crate::cancel::CancelSignal;
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::ContentDigest;

type Sink = CancelAwareWriter<HashingWriter<flate2::write::GzEncoder<CappedBuffer>>>;

/// A packaged build context.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Gzip-compressed tar stream.
    pub bytes: Bytes,
    /// Digest of the uncompressed tar stream.
    pub digest: ContentDigest,
    /// Regular files written.
    pub file_count: usize,
}

// Where the active ignore rules came from.
struct IgnoreSource {
    file: Option<String>,
    matcher: IgnoreMatcher,
}

/// Package `root` into a deterministic tar.gz.
///
/// `dockerfile` is relative to `root` and defaults to `Dockerfile`. It is
/// always included, as is the ignore file in effect, whatever the patterns say.
pub fn package(
    root: &Path,
    dockerfile: Option<&str>,
    cancel: &CancelSignal,
    diag: &mut Diagnostics,
) -> Result<Archive, ContextError> {
    let is_dir = std::fs::metadata(root).is_ok_and(|m| m.is_dir());
    ensure!(is_dir, ContextNotFoundSnafu { path: root });

    let requested = dockerfile.unwrap_or(DEFAULT_DOCKERFILE);
    let dockerfile = clean(requested);
    // Only a Dockerfile inside the context can ever be walked.
    let inside = !dockerfile.is_empty()
        && !dockerfile.starts_with('/')
        && dockerfile != ".."
        && !dockerfile.starts_with("../");
    ensure!(inside, DockerfileNotFoundSnafu { dockerfile: requested });
    let ignore = resolve_ignore(root, &dockerfile)?;

    let gz = GzBuilder::new()
        .mtime(0)
        .operating_system(255)
        .write(CappedBuffer::new(MAX_CONTEXT_SIZE), Compression::default());
    let sink = CancelAwareWriter::new(HashingWriter::new(gz), cancel.clone());
    let mut builder = Builder::new(sink);
    builder.mode(HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    let mut found_dockerfile = false;
    let mut file_count = 0usize;

    let mut walk = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walk.next() {
        ensure!(!cancel.is_cancelled(), CancelledSnafu);
        let entry = entry.context(WalkSnafu)?;
        let rel = relative_name(root, entry.path());

        if !found_dockerfile && rel == dockerfile {
            found_dockerfile = true;
        } else if ignore.file.as_deref() == Some(rel.as_str()) {
            // Kept so the remote build sees the same rules.
        } else if ignore.matcher.matches(&rel) {
            tracing::debug!(path = %rel, "excluding from build context");
            if entry.file_type().is_dir() {
                walk.skip_current_dir();
            }
            continue;
        }

        let file_type = entry.file_type();
        let metadata = entry.metadata().context(WalkSnafu)?;
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&metadata, HeaderMode::Deterministic);
        header.set_mtime(SOURCE_DATE_EPOCH);
        header.set_uid(0);
        header.set_gid(0);

        let written = if file_type.is_dir() {
            tracing::debug!(path = %rel, "adding directory");
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder.append_data(&mut header, &rel, io::empty())
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path()).context(IoSnafu {
                path: entry.path(),
            })?;
            tracing::debug!(path = %rel, target = %target.display(), "adding symlink");
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            builder.append_link(&mut header, &rel, &target)
        } else if file_type.is_file() {
            file_count += 1;
            if file_count == LARGE_CONTEXT_FILES + 1 {
                diag.warn(Warning::large_context(
                    &root.display().to_string(),
                    LARGE_CONTEXT_FILES,
                ));
            }
            tracing::debug!(path = %rel, size = metadata.len(), "adding file");
            let file = File::open(entry.path()).context(IoSnafu {
                path: entry.path(),
            })?;
            header.set_entry_type(EntryType::Regular);
            header.set_size(metadata.len());
            builder.append_data(&mut header, &rel, BufReader::new(file))
        } else {
            tracing::debug!(path = %rel, "skipping special file");
            continue;
        };
        written.map_err(|e| write_error(e, root, entry.path()))?;
    }

    let (bytes, digest) = finish(builder).map_err(|e| write_error(e, root, root))?;
    ensure!(found_dockerfile, DockerfileNotFoundSnafu { dockerfile });

    tracing::debug!(
        root = %root.display(),
        files = file_count,
        size = bytes.len(),
        digest = %digest,
        "packaged build context"
    );

    Ok(Archive {
        bytes: Bytes::from(bytes),
        digest,
        file_count,
    })
}

fn resolve_ignore(root: &Path, dockerfile: &str) -> Result<IgnoreSource, ContextError> {
    let candidates = [format!("{dockerfile}{DOCKERIGNORE}"), DOCKERIGNORE.to_string()];
    for candidate in candidates {
        let path = root.join(&candidate);
        let Ok(file) = File::open(&path) else {
            continue;
        };
        tracing::debug!(path = %path.display(), "reading ignore file");
        let patterns = read_patterns(BufReader::new(file)).context(IoSnafu { path: &path })?;
        return Ok(IgnoreSource {
            file: Some(candidate),
            matcher: IgnoreMatcher::compile(patterns)?,
        });
    }

    tracing::debug!("no ignore file found; using defaults");
    let patterns = read_patterns(DEFAULT_DOCKERIGNORE.as_bytes()).context(IoSnafu {
        path: PathBuf::from(DOCKERIGNORE),
    })?;
    Ok(IgnoreSource {
        file: None,
        matcher: IgnoreMatcher::compile(patterns)?,
    })
}

// Close the tar, then the digest tee, then gzip.
fn finish(builder: Builder<Sink>) -> io::Result<(Vec<u8>, ContentDigest)> {
    let sink = builder.into_inner()?;
    let (gz, digest) = sink.into_inner().finish();
    let buffer = gz.finish()?;
    Ok((buffer.into_inner(), ContentDigest::from_sha256(digest)))
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_error(err: io::Error, root: &Path, path: &Path) -> ContextError {
    if is_cancelled(&err) {
        ContextError::Cancelled
    } else if is_limit_exceeded(&err) {
        ContextError::SizeLimit {
            path: root.to_path_buf(),
            limit: MAX_CONTEXT_SIZE,
        }
    } else {
        ContextError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}
