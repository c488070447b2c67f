// ABOUTME: Dockerignore-compatible path matching.
// ABOUTME: Later patterns override earlier ones; a path is ignored when it or any ancestor matches.

use globset::{GlobBuilder, GlobMatcher};
use snafu::ResultExt;
use std::io::BufRead;

use super::error::{ContextError, PatternSnafu};

#[derive(Debug, Clone)]
struct Pattern {
    text: String,
    exclusion: bool,
    matcher: GlobMatcher,
}

/// Compiled, ordered ignore rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
}

impl IgnoreMatcher {
    /// Compile pattern lines as produced by [`read_patterns`].
    ///
    /// A leading `!` marks an exclusion that re-includes paths matched by an
    /// earlier pattern.
    pub fn compile<I, S>(lines: I) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            let (exclusion, raw) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let cleaned = clean(raw);
            let text = cleaned.trim_start_matches('/').to_string();
            if text.is_empty() {
                continue;
            }
            let matcher = GlobBuilder::new(&text)
                .literal_separator(true)
                .backslash_escape(true)
                .build()
                .context(PatternSnafu { pattern: line })?
                .compile_matcher();
            patterns.push(Pattern {
                text,
                exclusion,
                matcher,
            });
        }
        Ok(Self { patterns })
    }

    /// Whether `path` (relative, `/`-separated) is excluded.
    ///
    /// Each pattern is tried against the path and then against each of its
    /// ancestors, so `node_modules` also excludes `node_modules/x/y.js`.
    pub fn matches(&self, path: &str) -> bool {
        let path = clean(path);
        let ancestors: Vec<&str> = path
            .match_indices('/')
            .map(|(i, _)| &path[..i])
            .collect();

        let mut matched = false;
        for pattern in &self.patterns {
            // Inclusions can't change an already ignored path, exclusions
            // can't change one that isn't ignored.
            if pattern.exclusion != matched {
                continue;
            }
            let hit = pattern.matcher.is_match(path.as_str())
                || ancestors.iter().any(|a| pattern.matcher.is_match(a));
            if hit {
                tracing::trace!(path = %path, pattern = %pattern.text, exclusion = pattern.exclusion, "ignore rule hit");
                matched = !pattern.exclusion;
            }
        }
        matched
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Read ignore-file lines, skipping comments and blank lines.
pub fn read_patterns<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut patterns = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line = if n == 0 {
            line.trim_start_matches('\u{feff}')
        } else {
            line.as_str()
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        patterns.push(line.to_string());
    }
    Ok(patterns)
}

// Lexically clean a slash path: drop empty and `.` segments and fold `..`.
// A leading `/` is kept, and so are `..` segments that climb above the start.
pub(super) fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            s => parts.push(s),
        }
    }
    let joined = parts.join("/");
    if rooted { format!("/{joined}") } else { joined }
}
