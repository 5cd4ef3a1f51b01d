//! Raw call-stack capture.
//!
//! `std::backtrace::Backtrace` only exposes its frames through `Display`, so
//! the rendered text is parsed back into `(function, file, line)` triples.

use regex::Regex;
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One unprocessed frame as reported by the backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub function: String,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
}

impl RawFrame {
    pub fn new(function: impl Into<String>, file: Option<PathBuf>, line: Option<u32>) -> Self {
        Self {
            function: function.into(),
            file,
            line,
        }
    }

    /// Function name without module path or closure suffixes
    pub fn short_name(&self) -> &str {
        let mut name = self.function.as_str();
        while let Some(stripped) = name.strip_suffix("::{{closure}}") {
            name = stripped;
        }
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Captured call stack, innermost frame first.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<RawFrame>,
}

fn frame_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\d+:\s+)?(\S.*?)\s*$").expect("valid frame regex"))
}

fn frame_location() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*at\s+(.+?):(\d+)(?::\d+)?\s*$").expect("valid location regex")
    })
}

fn symbol_hash() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"::h[0-9a-f]{16}$").expect("valid hash regex"))
}

impl CallStack {
    /// Capture the current thread's stack regardless of `RUST_BACKTRACE`
    pub fn capture() -> Self {
        Self::parse(&Backtrace::force_capture().to_string())
    }

    pub fn from_frames(frames: Vec<RawFrame>) -> Self {
        Self { frames }
    }

    /// Parse the `Display` rendering of a backtrace.
    ///
    /// Each symbol line starts a frame; an indented `at file:line:col` line
    /// attaches a location to the frame before it. Inlined symbols print
    /// without an index and become frames of their own.
    pub fn parse(text: &str) -> Self {
        let mut frames: Vec<RawFrame> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("note:") {
                continue;
            }

            if let Some(caps) = frame_location().captures(line) {
                if let Some(frame) = frames.last_mut() {
                    if frame.file.is_none() {
                        frame.file = Some(PathBuf::from(&caps[1]));
                        frame.line = caps[2].parse().ok();
                    }
                }
                continue;
            }

            if let Some(caps) = frame_header().captures(line) {
                let function = symbol_hash().replace(&caps[1], "").into_owned();
                frames.push(RawFrame::new(function, None, None));
            }
        }

        Self { frames }
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the innermost frame located in `file`.
    ///
    /// This is the anchor the walker starts from: frames before it belong to
    /// the backtrace machinery and the engine itself.
    pub fn position_of_file(&self, file: &str) -> Option<usize> {
        let wanted = Path::new(file);
        self.frames.iter().position(|frame| {
            frame
                .file
                .as_deref()
                .is_some_and(|path| {
                    path == wanted || path.ends_with(wanted) || wanted.ends_with(path)
                })
        })
    }

    /// Override the reported line of one frame
    pub fn set_line(&mut self, index: usize, line: u32) {
        if let Some(frame) = self.frames.get_mut(index) {
            frame.line = Some(line);
        }
    }
}
