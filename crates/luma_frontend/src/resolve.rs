use std::path::{Path, PathBuf};

/// Resolves `@use` path strings against a list of standard-library roots.
///
/// Resolution order (first match wins):
/// 1. Paths already rooted at `std/` (either separator) are searched under
///    each configured std root.
/// 2. Bare names with no directory separator are retried with a `std/`
///    prefix.
/// 3. Anything else is returned as given — the caller decides whether it
///    exists on disk.
pub struct ImportResolver {
    std_roots: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
#[error("module '{path}' not found; searched: {}", searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
pub struct UnresolvedImport {
    pub path: String,
    pub searched: Vec<PathBuf>,
}

impl ImportResolver {
    pub fn new(std_roots: Vec<PathBuf>) -> Self {
        Self { std_roots }
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, UnresolvedImport> {
        let normalized = raw.replace('\\', "/");
        if let Some(rest) = normalized.strip_prefix("std/") {
            return self.search_std(rest, raw);
        }
        if !normalized.contains('/') {
            return self.search_std(&normalized, raw);
        }
        Ok(PathBuf::from(normalized))
    }

    fn search_std(&self, rest: &str, original: &str) -> Result<PathBuf, UnresolvedImport> {
        let mut searched = Vec::new();
        for root in &self.std_roots {
            let candidate = with_extension(root, rest);
            if candidate.exists() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        Err(UnresolvedImport {
            path: original.to_string(),
            searched,
        })
    }
}

fn with_extension(root: &Path, rest: &str) -> PathBuf {
    let mut p = root.join(rest);
    if p.extension().is_none() {
        p.set_extension("luma");
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn retries_bare_name_under_std_prefix() {
        let dir = std::env::temp_dir().join("luma_resolver_test_bare");
        fs::create_dir_all(dir.join("std")).unwrap();
        fs::write(dir.join("std/io.luma"), "").unwrap();
        let resolver = ImportResolver::new(vec![dir.clone()]);
        let resolved = resolver.resolve("io").unwrap();
        assert_eq!(resolved, dir.join("std/io.luma"));
    }

    #[test]
    fn reports_search_roots_on_failure() {
        let resolver = ImportResolver::new(vec![PathBuf::from("/nonexistent/root")]);
        let err = resolver.resolve("std/missing").unwrap_err();
        assert_eq!(err.searched.len(), 1);
    }

    #[test]
    fn passes_through_explicit_relative_path() {
        let resolver = ImportResolver::new(vec![]);
        let resolved = resolver.resolve("local/helper.luma").unwrap();
        assert_eq!(resolved, PathBuf::from("local/helper.luma"));
    }
}
