use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::trace;

use crate::error::{LoaderError, LoaderResult};

/// Patterns applied by [`PluginLoader::filter`](crate::PluginLoader::filter)
/// when none are configured.
pub const DEFAULT_PATTERNS: [&str; 3] = ["**", "!node_modules", "!.git"];

/// An ordered list of include (`pattern`) and exclude (`!pattern`) globs.
///
/// Patterns apply in order: an include adds every path it matches, an
/// exclude removes every path it matches from what is included so far. A
/// pattern matches a path if it matches the whole path or its final segment.
#[derive(Debug, Clone)]
pub struct PatternSet {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    exclude: bool,
    pattern: Pattern,
}

impl Rule {
    fn hits(&self, path: &Path) -> bool {
        self.pattern.matches_path(path)
            || path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.pattern.matches(name))
    }
}

impl PatternSet {
    /// Compiles `patterns`.
    pub fn new<I, S>(patterns: I) -> LoaderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|raw| compile(raw.as_ref()))
            .collect::<LoaderResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Builds an exclusion-only set: everything is included, then each of
    /// `patterns` is removed. A leading `!` on a pattern is optional.
    pub fn exclusion<I, S>(patterns: I) -> LoaderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let negated = patterns.into_iter().map(|p| {
            let p = p.as_ref();
            if p.starts_with('!') {
                p.to_string()
            } else {
                format!("!{p}")
            }
        });
        Self::new(std::iter::once("**".to_string()).chain(negated))
    }

    /// Returns `true` if `path` survives every rule.
    pub fn matches(&self, path: &Path) -> bool {
        let mut included = false;
        for rule in &self.rules {
            if rule.exclude == included && rule.hits(path) {
                included = !rule.exclude;
            }
        }
        included
    }

    /// Keeps the paths that match, in their original order.
    pub fn apply(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths
            .into_iter()
            .filter(|path| {
                let keep = self.matches(path);
                if !keep {
                    trace!(path = %path.display(), "Filtered out by pattern");
                }
                keep
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile(raw: &str) -> LoaderResult<Rule> {
    let (exclude, body) = match raw.strip_prefix('!') {
        Some(body) => (true, body),
        None => (false, raw),
    };
    let pattern = Pattern::new(body).map_err(|source| LoaderError::InvalidPattern {
        pattern: raw.to_string(),
        source,
    })?;
    Ok(Rule { exclude, pattern })
}
