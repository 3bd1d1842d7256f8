//! Symbol model and the extractor adapter interface
//!
//! Symbol extraction itself is a per-language concern implemented outside
//! this crate. The crawler only depends on the [`SymbolExtractor`] trait and
//! treats implementations as best-effort: individual file failures are
//! skipped, not propagated.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The kind of a source-level symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Const,
    Var,
    Macro,
    Field,
}

/// One extracted symbol, owned by the crawl run until persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol name as written in source
    pub name: String,

    /// What kind of declaration produced it
    pub kind: SymbolKind,

    /// Full signature line, trimmed
    pub signature: String,

    /// Path of the defining file, relative to the package root
    pub file_path: String,

    /// 1-based line number of the declaration
    pub line: u32,

    /// Whether the symbol is exported / public
    pub is_public: bool,

    /// Attached documentation, if any
    pub doc: Option<String>,
}

/// Per-language symbol extractor, consumed as a black box
///
/// Implementations are expected to be regex- or heuristic-based and
/// therefore lossy in both directions; the crawler records whatever they
/// return and never treats their output as authoritative.
pub trait SymbolExtractor: Send + Sync {
    /// Extracts symbols from a single source file
    fn parse_file(&self, path: &Path) -> std::io::Result<Vec<Symbol>>;

    /// Returns true if this extractor understands the given file
    ///
    /// Used by [`parse_directory`](SymbolExtractor::parse_directory) to skip
    /// non-source files without opening them.
    fn matches(&self, path: &Path) -> bool;

    /// Extracts symbols from every matching file under `dir`, recursively
    ///
    /// Tolerant by contract: a file that fails to parse is logged and
    /// skipped, and the walk continues.
    fn parse_directory(&self, dir: &Path) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        walk(self, dir, &mut symbols);
        symbols
    }
}

fn walk<E: SymbolExtractor + ?Sized>(extractor: &E, dir: &Path, out: &mut Vec<Symbol>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(extractor, &path, out);
        } else if extractor.matches(&path) {
            match extractor.parse_file(&path) {
                Ok(mut symbols) => out.append(&mut symbols),
                Err(e) => {
                    tracing::debug!("Skipping unparseable file {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Extractor that records one symbol per non-empty line of `.x` files
    struct LineExtractor;

    impl SymbolExtractor for LineExtractor {
        fn parse_file(&self, path: &Path) -> std::io::Result<Vec<Symbol>> {
            let content = std::fs::read_to_string(path)?;
            Ok(content
                .lines()
                .enumerate()
                .filter(|(_, l)| !l.is_empty())
                .map(|(i, l)| Symbol {
                    name: l.to_string(),
                    kind: SymbolKind::Function,
                    signature: l.to_string(),
                    file_path: path.display().to_string(),
                    line: (i + 1) as u32,
                    is_public: true,
                    doc: None,
                })
                .collect())
        }

        fn matches(&self, path: &Path) -> bool {
            path.extension().is_some_and(|ext| ext == "x")
        }
    }

    #[test]
    fn parse_directory_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let mut f = std::fs::File::create(dir.path().join("a.x")).unwrap();
        writeln!(f, "alpha").unwrap();
        let mut g = std::fs::File::create(sub.join("b.x")).unwrap();
        writeln!(g, "beta").unwrap();
        // Not matched by the extractor
        std::fs::File::create(dir.path().join("c.txt")).unwrap();

        let mut symbols = LineExtractor.parse_directory(dir.path());
        symbols.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "alpha");
        assert_eq!(symbols[1].name, "beta");
    }

    #[test]
    fn parse_directory_tolerates_missing_dir() {
        let symbols = LineExtractor.parse_directory(Path::new("/nonexistent/symdex"));
        assert!(symbols.is_empty());
    }

    #[test]
    fn invalid_utf8_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.x"), [0xff, 0xfe, 0x00]).unwrap();
        let mut f = std::fs::File::create(dir.path().join("ok.x")).unwrap();
        writeln!(f, "gamma").unwrap();

        let symbols = LineExtractor.parse_directory(dir.path());
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "gamma");
    }
}
