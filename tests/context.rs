// ABOUTME: Integration tests for build context packaging.
// ABOUTME: Entry selection, ignore file precedence, reproducibility, limits and cancellation.

mod support;

use hoist::cancel::CancelSignal;
use hoist::context::{Archive, ContextErrorKind, SOURCE_DATE_EPOCH, package};
use hoist::diagnostics::{Diagnostics, WarningKind};
use hoist::types::ContentDigest;
use std::io::Read;
use std::path::Path;
use support::{archive_entries, fixture, init_tracing, write_tree};

fn pack(root: &Path, dockerfile: Option<&str>) -> Archive {
    init_tracing();
    let mut diag = Diagnostics::default();
    package(root, dockerfile, &CancelSignal::new(), &mut diag).unwrap()
}

fn pack_err(root: &Path, dockerfile: Option<&str>) -> ContextErrorKind {
    let mut diag = Diagnostics::default();
    package(root, dockerfile, &CancelSignal::new(), &mut diag)
        .unwrap_err()
        .kind()
}

mod entries {
    use super::*;

    #[test]
    fn fixture_keeps_ignore_file_and_dockerfile() {
        let archive = pack(&fixture("testproj"), None);
        assert_eq!(
            archive_entries(&archive.bytes),
            [".dockerignore", "Dockerfile", "fileName.env"]
        );
        assert_eq!(archive.file_count, 3);
    }

    #[test]
    fn default_patterns_apply_without_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("Dockerfile", "FROM scratch\n"),
                ("compose.yaml", "services: {}\n"),
                (".git/HEAD", "ref: refs/heads/main\n"),
                ("node_modules/left-pad/index.js", "module.exports = 1;\n"),
                ("src/.DS_Store", "junk"),
                ("src/main.rs", "fn main() {}\n"),
                ("hoist", "binary"),
                ("tools/hoist", "nested binary is kept"),
            ],
        );

        let archive = pack(dir.path(), None);
        assert_eq!(
            archive_entries(&archive.bytes),
            ["Dockerfile", "src", "src/main.rs", "tools", "tools/hoist"]
        );
    }

    #[test]
    fn dockerfile_specific_ignore_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("Dockerfile.dev", "FROM scratch\n"),
                ("Dockerfile.dev.dockerignore", "*.txt\n"),
                (".dockerignore", "*.md\n"),
                ("a.txt", "a"),
                ("b.md", "b"),
            ],
        );

        let archive = pack(dir.path(), Some("Dockerfile.dev"));
        assert_eq!(
            archive_entries(&archive.bytes),
            [".dockerignore", "Dockerfile.dev", "Dockerfile.dev.dockerignore", "b.md"]
        );
    }

    #[test]
    fn root_ignore_file_used_for_other_dockerfiles() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("Dockerfile", "FROM scratch\n"),
                ("Dockerfile.dev.dockerignore", "*.md\n"),
                (".dockerignore", "*.txt\n"),
                ("a.txt", "a"),
                ("b.md", "b"),
            ],
        );

        let archive = pack(dir.path(), None);
        assert_eq!(
            archive_entries(&archive.bytes),
            [".dockerignore", "Dockerfile", "Dockerfile.dev.dockerignore", "b.md"]
        );
    }

    #[test]
    fn reserved_files_survive_their_own_patterns() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("Dockerfile", "FROM scratch\n"),
                (".dockerignore", ".dockerignore\nDockerfile\nsecret.txt\n"),
                ("secret.txt", "hunter2"),
            ],
        );

        let archive = pack(dir.path(), None);
        assert_eq!(archive_entries(&archive.bytes), [".dockerignore", "Dockerfile"]);
    }

    #[test]
    fn negated_patterns_reinclude_files() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("Dockerfile", "FROM scratch\n"),
                (".dockerignore", "*.log\n!important.log\n"),
                ("debug.log", "noise"),
                ("important.log", "keep me"),
            ],
        );

        let archive = pack(dir.path(), None);
        assert_eq!(
            archive_entries(&archive.bytes),
            [".dockerignore", "Dockerfile", "important.log"]
        );
    }

    #[test]
    fn ignored_directories_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("Dockerfile", "FROM scratch\n"),
                (".dockerignore", "cache\n"),
                ("cache/a/b/c.bin", "x"),
                ("cache/d.bin", "y"),
                ("cached.txt", "kept"),
            ],
        );

        let archive = pack(dir.path(), None);
        assert_eq!(
            archive_entries(&archive.bytes),
            [".dockerignore", "Dockerfile", "cached.txt"]
        );
    }

    #[test]
    fn dockerfile_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[("docker/app.Dockerfile", "FROM scratch\n"), ("app.py", "print()\n")],
        );

        let archive = pack(dir.path(), Some("./docker//app.Dockerfile"));
        assert_eq!(
            archive_entries(&archive.bytes),
            ["app.py", "docker", "docker/app.Dockerfile"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_header_only() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("Dockerfile", "FROM scratch\n")]);
        std::os::unix::fs::symlink("Dockerfile", dir.path().join("link")).unwrap();

        let archive = pack(dir.path(), None);
        let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(&archive.bytes[..]));
        let link = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap())
            .find(|e| e.path().unwrap().to_str() == Some("link"))
            .expect("link entry");
        assert_eq!(link.header().entry_type(), tar::EntryType::Symlink);
        assert_eq!(link.header().size().unwrap(), 0);
        assert_eq!(
            link.link_name().unwrap().unwrap().to_str(),
            Some("Dockerfile")
        );
        assert_eq!(archive.file_count, 1);
    }
}

mod determinism {
    use super::*;

    #[test]
    fn repeated_packaging_is_byte_identical() {
        let first = pack(&fixture("testproj"), None);
        let second = pack(&fixture("testproj"), None);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn headers_are_normalized() {
        let archive = pack(&fixture("testproj"), None);
        let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(&archive.bytes[..]));
        for entry in tar.entries().unwrap() {
            let entry = entry.unwrap();
            let header = entry.header();
            assert_eq!(header.mtime().unwrap(), SOURCE_DATE_EPOCH);
            assert_eq!(header.uid().unwrap(), 0);
            assert_eq!(header.gid().unwrap(), 0);
        }
    }

    #[test]
    fn digest_covers_uncompressed_stream() {
        let archive = pack(&fixture("testproj"), None);
        let mut raw = Vec::new();
        flate2::read::GzDecoder::new(&archive.bytes[..])
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(archive.digest, ContentDigest::of(&raw));
        assert!(archive.digest.as_str().starts_with("sha256-"));
    }

    #[test]
    fn content_change_changes_digest() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("Dockerfile", "FROM scratch\n")]);
        let before = pack(dir.path(), None);
        write_tree(dir.path(), &[("Dockerfile", "FROM alpine\n")]);
        let after = pack(dir.path(), None);
        assert_ne!(before.digest, after.digest);
    }
}

mod failures {
    use super::*;

    #[test]
    fn missing_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("app.py", "print()\n")]);
        assert_eq!(pack_err(dir.path(), None), ContextErrorKind::DockerfileNotFound);
        assert_eq!(
            pack_err(dir.path(), Some("Dockerfile.prod")),
            ContextErrorKind::DockerfileNotFound
        );
    }

    #[test]
    fn dockerfile_outside_context_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[("Dockerfile", "FROM outside\n"), ("ctx/Dockerfile", "FROM inside\n")],
        );
        let ctx = dir.path().join("ctx");

        assert_eq!(
            pack_err(&ctx, Some("../Dockerfile")),
            ContextErrorKind::DockerfileNotFound
        );
        assert_eq!(
            pack_err(&ctx, Some("sub/../../Dockerfile")),
            ContextErrorKind::DockerfileNotFound
        );
        assert_eq!(
            pack_err(&ctx, Some("/Dockerfile")),
            ContextErrorKind::DockerfileNotFound
        );
        let absolute = dir.path().join("Dockerfile");
        assert_eq!(
            pack_err(&ctx, Some(absolute.to_str().unwrap())),
            ContextErrorKind::DockerfileNotFound
        );
    }

    #[test]
    fn dockerfile_path_resolving_inside_context_is_found() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("Dockerfile", "FROM scratch\n")]);
        let archive = pack(dir.path(), Some("docker/../Dockerfile"));
        assert_eq!(archive_entries(&archive.bytes), ["Dockerfile"]);
    }

    #[test]
    fn missing_context_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            pack_err(&dir.path().join("nope"), None),
            ContextErrorKind::ContextNotFound
        );
    }

    #[test]
    fn context_that_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("Dockerfile", "FROM scratch\n")]);
        assert_eq!(
            pack_err(&dir.path().join("Dockerfile"), None),
            ContextErrorKind::ContextNotFound
        );
    }

    #[test]
    fn oversized_context_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("Dockerfile", "FROM scratch\n")]);

        // xorshift output doesn't compress, so the gzip stream tracks the input size.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut noise = Vec::with_capacity(11 * 1024 * 1024);
        while noise.len() < 11 * 1024 * 1024 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            noise.extend_from_slice(&state.to_le_bytes());
        }
        std::fs::write(dir.path().join("blob.bin"), noise).unwrap();

        assert_eq!(pack_err(dir.path(), None), ContextErrorKind::SizeLimit);
    }

    #[test]
    fn malformed_ignore_pattern() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[("Dockerfile", "FROM scratch\n"), (".dockerignore", "src/[z-\n")],
        );
        assert_eq!(pack_err(dir.path(), None), ContextErrorKind::InvalidPattern);
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelSignal::new();
        cancel.cancel();
        let mut diag = Diagnostics::default();
        let err = package(&fixture("testproj"), None, &cancel, &mut diag).unwrap_err();
        assert_eq!(err.kind(), ContextErrorKind::Cancelled);
    }
}

mod warnings {
    use super::*;

    fn tree_with(files: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("Dockerfile", "FROM scratch\n")]);
        for i in 1..files {
            write_tree(dir.path(), &[(format!("f{i:02}.txt").as_str(), "x")]);
        }
        dir
    }

    #[test]
    fn ten_files_are_quiet() {
        let dir = tree_with(10);
        let mut diag = Diagnostics::default();
        let archive = package(dir.path(), None, &CancelSignal::new(), &mut diag).unwrap();
        assert_eq!(archive.file_count, 10);
        assert!(!diag.has_warnings());
    }

    #[test]
    fn eleventh_file_warns_once() {
        let dir = tree_with(15);
        let mut diag = Diagnostics::default();
        let archive = package(dir.path(), None, &CancelSignal::new(), &mut diag).unwrap();
        assert_eq!(archive.file_count, 15);
        assert!(diag.contains(WarningKind::LargeContext));
        assert_eq!(diag.warnings().len(), 1);
    }
}
