//! Friendly rewrites of raw program messages
//!
//! Pattern files map ids to message shapes where `&$var` marks a hole, e.g.
//! `"error: '&$var' undeclared"`. The locale file maps the same ids to a
//! rewrite whose holes receive the captured text in order.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::CatalogError;

const HOLE: &str = "&$var";

/// Language id for the enhancement files, chosen by submission file extension.
pub fn language_for_file(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let language = match ext {
        "ada" | "adb" | "ads" => "ada",
        "asm" => "asm",
        "c" => "c",
        "cc" | "cpp" | "C" | "c++" => "cpp",
        "clj" => "clojure",
        "cs" => "csharp",
        "d" => "d",
        "erl" => "erlang",
        "go" => "go",
        "groovy" => "groovy",
        "java" => "java",
        "js" => "javascript",
        "scala" => "scala",
        "sql" => "sql",
        "scm" => "scheme",
        "s" => "mips",
        "kt" => "kotlin",
        "lisp" | "lsp" => "lisp",
        "lua" => "lua",
        "sh" => "shell",
        "pas" | "p" => "pascal",
        "f77" | "f90" | "f" | "for" => "fortran",
        "pl" | "pro" => "prolog",
        "htm" | "html" => "html",
        "hs" => "haskell",
        "m" => "matlab",
        "mzn" => "minizinc",
        "perl" | "prl" => "perl",
        "php" => "php",
        "py" => "python",
        "v" | "vh" | "vhd" | "vhdl" => "verilog",
        "r" | "R" => "r",
        "rb" | "ruby" => "ruby",
        "ts" => "typescript",
        _ => return None,
    };
    Some(language)
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    rewrite: String,
}

/// Ordered set of rewrite rules for one language and locale.
#[derive(Debug, Clone, Default)]
pub struct Enhancer {
    rules: Vec<Rule>,
}

impl Enhancer {
    /// Load `<lang_dir>/enhance/<language>/default.json` and the locale rewrites
    /// from `<code>.json` next to it (falling back to the patterns themselves).
    pub fn load(lang_dir: &Path, language: &str, code: &str) -> Result<Self, CatalogError> {
        let dir = lang_dir.join("enhance").join(language);
        let patterns = read_map(&dir.join("default.json"))?;
        let localized = dir.join(format!("{}.json", code));
        let rewrites = if localized.exists() {
            read_map(&localized)?
        } else {
            patterns.clone()
        };
        Ok(Self::from_maps(patterns, rewrites))
    }

    fn from_maps(patterns: BTreeMap<String, String>, rewrites: BTreeMap<String, String>) -> Self {
        let rules = patterns
            .into_iter()
            .filter_map(|(id, pattern)| match rewrites.get(&id) {
                Some(rewrite) => Some(Rule {
                    pattern,
                    rewrite: rewrite.clone(),
                }),
                None => {
                    warn!("Enhancement rule {} has no rewrite, skipping", id);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Rewrite `line` with the first matching rule, or return it unchanged.
    pub fn enhance<'a>(&self, line: &'a str) -> Cow<'a, str> {
        for rule in &self.rules {
            if !rule.pattern.contains(HOLE) {
                if line == rule.pattern {
                    return Cow::Owned(rule.rewrite.clone());
                }
                continue;
            }
            if let Some(holes) = capture_holes(line, &rule.pattern) {
                return Cow::Owned(put_holes(&rule.rewrite, &holes));
            }
        }
        Cow::Borrowed(line)
    }
}

fn read_map(path: &Path) -> Result<BTreeMap<String, String>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
        origin: path.display().to_string(),
        source,
    })
}

/// Text following each literal piece of `pattern` in `line`, up to the next
/// piece. `None` when a piece is missing or out of order.
fn capture_holes<'a>(line: &'a str, pattern: &str) -> Option<Vec<&'a str>> {
    let pieces: Vec<&str> = pattern.split(HOLE).collect();
    if pieces.iter().any(|piece| !line.contains(piece)) {
        return None;
    }

    let mut holes = Vec::with_capacity(pieces.len());
    let mut pos = 0;
    for (i, piece) in pieces.iter().enumerate() {
        let start = pos + line[pos..].find(piece)? + piece.len();
        match pieces.get(i + 1) {
            Some(next) if !next.is_empty() => {
                let end = start + line[start..].find(next)?;
                holes.push(&line[start..end]);
                pos = end;
            }
            _ => {
                holes.push(&line[start..]);
                pos = start;
            }
        }
    }
    Some(holes)
}

fn put_holes(rewrite: &str, holes: &[&str]) -> String {
    let mut out = String::with_capacity(rewrite.len());
    for (i, piece) in rewrite.split(HOLE).enumerate() {
        if i > 0 {
            if let Some(hole) = holes.get(i - 1) {
                out.push_str(hole);
            }
        }
        out.push_str(piece);
    }
    out
}
