//! Source text lookup and call-expression extraction

use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How far back the compact mode looks for the start of a call expression
pub const CALL_LOOKBACK_LINES: usize = 10;

/// How far back the full mode looks for the enclosing `fn` line
pub const FUNCTION_LOOKBACK_LINES: usize = 200;

/// Caches source files by path. Files that cannot be read are cached as
/// missing so the walker stops on them without retrying the filesystem.
#[derive(Debug, Default)]
pub struct SourceCache {
    roots: Vec<PathBuf>,
    files: HashMap<PathBuf, Option<Arc<Vec<String>>>>,
}

impl SourceCache {
    /// Resolve relative paths against the current directory and, when set,
    /// `CARGO_MANIFEST_DIR`.
    pub fn new() -> Self {
        let mut roots = Vec::new();
        if let Ok(dir) = env::current_dir() {
            roots.push(dir);
        }
        if let Some(dir) = env::var_os("CARGO_MANIFEST_DIR") {
            roots.push(PathBuf::from(dir));
        }
        Self::with_roots(roots)
    }

    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            files: HashMap::new(),
        }
    }

    /// Lines of `file`, or `None` when its source is unavailable
    pub fn lines(&mut self, file: &Path) -> Option<Arc<Vec<String>>> {
        if let Some(cached) = self.files.get(file) {
            return cached.clone();
        }

        let loaded = self.read(file).map(Arc::new);
        self.files.insert(file.to_path_buf(), loaded.clone());
        loaded
    }

    fn read(&self, file: &Path) -> Option<Vec<String>> {
        let candidates: Vec<PathBuf> = if file.is_absolute() {
            vec![file.to_path_buf()]
        } else {
            self.roots.iter().map(|root| root.join(file)).collect()
        };

        candidates
            .into_iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .map(|content| content.lines().map(str::to_string).collect())
    }
}

/// Replace the first character of the call line with `>`, keeping the
/// indentation of the remaining text aligned with its neighbours.
pub fn mark_call_line(line: &str) -> String {
    let rest: String = line.chars().skip(1).collect();
    format!(">{rest}")
}

fn paren_balance(line: &str) -> (usize, usize) {
    (line.matches('(').count(), line.matches(')').count())
}

/// Compact mode: the smallest window of lines presenting the whole call
/// expression.
///
/// Scans backward from the call line while the parentheses are unbalanced
/// (the call line closes a group opened above), then forward while the call
/// line leaves a group open, each direction limited to
/// [`CALL_LOOKBACK_LINES`]. `call_line` is 1-based.
pub fn call_source(lines: &[String], call_line: usize) -> Vec<String> {
    let Some(call_index) = call_line.checked_sub(1).filter(|i| *i < lines.len()) else {
        return Vec::new();
    };

    let call_text = &lines[call_index];
    let (mut left, mut right) = paren_balance(call_text);
    let mut before = Vec::new();

    let lower_bound = call_index.saturating_sub(CALL_LOOKBACK_LINES);
    let mut preceding = call_index;
    while right > left && preceding > lower_bound {
        preceding -= 1;
        let line = &lines[preceding];
        before.insert(0, line.clone());
        let (l, r) = paren_balance(line);
        left += l;
        right += r;
    }

    let mut source = before;
    source.push(mark_call_line(call_text));

    let upper_bound = (call_index + CALL_LOOKBACK_LINES).min(lines.len() - 1);
    let mut following = call_index;
    while left > right && following < upper_bound {
        following += 1;
        let line = &lines[following];
        source.push(line.clone());
        let (l, r) = paren_balance(line);
        left += l;
        right += r;
    }

    source
}

/// Full mode: every line of the calling function from its `fn` line through
/// the call line.
///
/// Returns `None` when the `fn` line cannot be found within
/// [`FUNCTION_LOOKBACK_LINES`].
pub fn function_source(lines: &[String], call_line: usize, function: &str) -> Option<Vec<String>> {
    let call_index = call_line.checked_sub(1).filter(|i| *i < lines.len())?;
    let pattern = Regex::new(&format!(r"\bfn\s+{}\b", regex::escape(function))).ok()?;

    let lower_bound = call_index.saturating_sub(FUNCTION_LOOKBACK_LINES);
    let start = (lower_bound..=call_index)
        .rev()
        .find(|i| pattern.is_match(&lines[*i]))?;

    let mut source: Vec<String> = lines[start..call_index].to_vec();
    source.push(mark_call_line(&lines[call_index]));
    Some(source)
}

/// Name of the function whose `fn` line precedes `call_line` most closely,
/// searching back at most [`FUNCTION_LOOKBACK_LINES`].
pub fn enclosing_function(lines: &[String], call_line: usize) -> Option<String> {
    let call_index = call_line.checked_sub(1).filter(|i| *i < lines.len())?;
    let pattern = Regex::new(r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)").ok()?;

    let lower_bound = call_index.saturating_sub(FUNCTION_LOOKBACK_LINES);
    (lower_bound..=call_index)
        .rev()
        .find_map(|i| pattern.captures(&lines[i]).map(|caps| caps[1].to_string()))
}
