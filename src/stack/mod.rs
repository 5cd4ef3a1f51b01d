//! Stack Walker
//!
//! Reconstructs a bounded, filtered sequence of frames from a captured call
//! stack. Each frame carries its `file:line:function` location, an optional
//! locals snapshot and the source lines of the call.
//!
//! # Fidelity
//!
//! Frames come from a forced `std::backtrace::Backtrace`, so the walk needs
//! debug info and readable source files. The first frame whose source
//! cannot be read ends the walk; nothing is fabricated for it. Local
//! variables cannot be reflected and are only present when the caller
//! supplied a snapshot for the innermost frame.

mod backtrace;
mod source;


pub use backtrace::{CallStack, RawFrame};
pub use source::{call_source, enclosing_function, function_source, mark_call_line, SourceCache};

use crate::models::Frame;

/// Upper bound on the number of frames walked
pub const MAX_TRACEBACK_DEPTH: usize = 20;

/// Call-line markers identifying the runner's own test-invocation wrapper
pub const BOUNDARY_MARKERS: [&str; 3] = ["testfunction", "fixturefunc", "run_test"];

/// Options for a single walk
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Stop at the first call line containing a boundary marker
    pub stop_at_boundary: bool,
    /// Include the calling function's source from its `fn` line
    pub full_trace: bool,
    pub max_depth: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            stop_at_boundary: true,
            full_trace: false,
            max_depth: MAX_TRACEBACK_DEPTH,
        }
    }
}

/// Check a calling line for one of the boundary markers
pub fn trace_end_detected(call_line: &str) -> bool {
    if call_line.is_empty() {
        return false;
    }
    BOUNDARY_MARKERS
        .iter()
        .any(|marker| call_line.contains(marker))
}

/// Describe one frame, or `None` if the walk must end here (no source, or a
/// boundary marker in the call line).
pub fn describe_frame(
    raw: &RawFrame,
    options: &WalkOptions,
    locals: Option<&str>,
    cache: &mut SourceCache,
) -> Option<Frame> {
    let file = raw.file.as_deref()?;
    let line = usize::try_from(raw.line?).ok()?;
    let lines = cache.lines(file)?;
    let call_text = lines.get(line.checked_sub(1)?)?;

    if options.stop_at_boundary && trace_end_detected(call_text.trim()) {
        return None;
    }

    let source = if options.full_trace {
        function_source(&lines, line, raw.short_name())
            .unwrap_or_else(|| call_source(&lines, line))
    } else {
        call_source(&lines, line)
    };

    let location = format!("{}:{}:{}", file.display(), line, raw.short_name());
    Some(Frame::new(location, locals.map(str::to_string), source))
}

/// Walk `stack` from `start_depth` outward.
///
/// `innermost_locals` is attached to the frame at `start_depth`. Each newly
/// discovered outer frame is prepended, so the result reads outermost to
/// innermost. Walking past `options.max_depth` frames stops without error.
pub fn reconstruct(
    stack: &CallStack,
    start_depth: usize,
    options: &WalkOptions,
    innermost_locals: Option<&str>,
    cache: &mut SourceCache,
) -> Vec<Frame> {
    let mut trace = Vec::new();

    for (offset, raw) in stack
        .frames()
        .iter()
        .skip(start_depth)
        .take(options.max_depth)
        .enumerate()
    {
        let locals = if offset == 0 { innermost_locals } else { None };
        match describe_frame(raw, options, locals, cache) {
            Some(frame) => trace.insert(0, frame),
            None => break,
        }
    }

    tracing::debug!(
        target: "soft_verify::verify",
        start_depth,
        frames = trace.len(),
        "reconstructed traceback"
    );
    trace
}

/// Frames of a captured error's own backtrace, innermost last.
///
/// Leading frames without readable source (the panic machinery) are
/// skipped; after the first readable frame the walk follows the same
/// termination rules as [`reconstruct`]. Only the call line is kept for
/// each frame. When no backtrace frame is usable, the panic `location`
/// (`file:line:column`) yields a single frame.
pub fn exception_frames(
    backtrace: Option<&str>,
    location: Option<&str>,
    options: &WalkOptions,
    cache: &mut SourceCache,
) -> Vec<Frame> {
    let mut trace = Vec::new();

    if let Some(text) = backtrace {
        let stack = CallStack::parse(text);
        let mut started = false;

        for raw in stack.frames() {
            if trace.len() >= options.max_depth {
                break;
            }
            match exception_frame(raw, options, cache) {
                Some(frame) => {
                    started = true;
                    trace.insert(0, frame);
                }
                None if started => break,
                None => continue,
            }
        }
    }

    if trace.is_empty() {
        if let Some(raw) = location.and_then(parse_location) {
            if let Some(frame) = exception_frame(&raw, options, cache) {
                trace.push(frame);
            }
        }
    }

    trace
}

fn exception_frame(
    raw: &RawFrame,
    options: &WalkOptions,
    cache: &mut SourceCache,
) -> Option<Frame> {
    let file = raw.file.as_deref()?;
    let line = raw.line?;
    let lines = cache.lines(file)?;
    let call_text = lines.get(usize::try_from(line).ok()?.checked_sub(1)?)?;
    let call_text = call_text.trim();

    if options.stop_at_boundary && trace_end_detected(call_text) {
        return None;
    }

    let location = format!("{}:{}:{}", file.display(), line, raw.short_name());
    Some(Frame::new(location, None, vec![format!(">   {call_text}")]))
}

/// Parse a `file:line[:column]` panic location
fn parse_location(location: &str) -> Option<RawFrame> {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next()?;
    let middle = parts.next()?;
    let (file, line) = match parts.next() {
        Some(file) => (file, middle),
        None => (middle, last),
    };
    let line: u32 = line.parse().ok()?;
    Some(RawFrame::new("<panic>", Some(file.into()), Some(line)))
}
