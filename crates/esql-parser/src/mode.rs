// Lexer modes
//
// The lexer's grammar depends on which command it is inside. Modes live on
// a stack of frames; a frame opened by `[` is marked so `]` can close it and
// so end-of-input can tell command frames from unbalanced brackets.

use serde::Serialize;
use tracing::trace;

/// A lexical context. Each mode decides which tokens are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Default,
    Expression,
    Explain,
    From,
    Project,
    Rename,
    Enrich,
    EnrichField,
    MvExpand,
    Show,
    Setting,
    Lookup,
    LookupField,
    Metrics,
    ClosingMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    mode: Mode,
    /// Whether this frame was opened by `[`.
    bracket: bool,
}

/// Stack of active modes. Never empty: the bottom frame is always Default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeStack {
    frames: Vec<Frame>,
}

impl Default for ModeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                mode: Mode::Default,
                bracket: false,
            }],
        }
    }

    /// The mode of the top frame.
    #[must_use]
    pub fn current(&self) -> Mode {
        self.frames.last().map_or(Mode::Default, |f| f.mode)
    }

    /// Modes from bottom to top.
    #[must_use]
    pub fn modes(&self) -> Vec<Mode> {
        self.frames.iter().map(|f| f.mode).collect()
    }

    pub fn push(&mut self, mode: Mode) {
        trace!(?mode, depth = self.frames.len() + 1, "push mode");
        self.frames.push(Frame {
            mode,
            bracket: false,
        });
    }

    pub fn push_bracket(&mut self, mode: Mode) {
        trace!(?mode, depth = self.frames.len() + 1, "push bracket mode");
        self.frames.push(Frame {
            mode,
            bracket: true,
        });
    }

    /// Replace the mode of the top frame, keeping its bracket flag.
    pub fn switch(&mut self, mode: Mode) {
        if self.frames.len() == 1 {
            self.push(mode);
            return;
        }
        if let Some(top) = self.frames.last_mut() {
            trace!(from = ?top.mode, to = ?mode, "switch mode");
            top.mode = mode;
        }
    }

    /// `|`: pop frames until the top frame is a Default frame.
    pub fn pop_to_default(&mut self) {
        while self.frames.len() > 1 && self.current() != Mode::Default {
            self.frames.pop();
        }
        trace!(depth = self.frames.len(), "pipe");
    }

    /// `]`: close the most recent bracket frame and everything above it.
    /// Returns false (and leaves the stack alone) when no bracket is open.
    pub fn close_bracket(&mut self) -> bool {
        match self.frames.iter().rposition(|f| f.bracket) {
            Some(idx) => {
                self.frames.truncate(idx);
                trace!(depth = self.frames.len(), "close bracket");
                true
            }
            None => false,
        }
    }

    /// Drop everything but the bottom Default frame.
    pub fn reset(&mut self) {
        self.frames.truncate(1);
        trace!("reset mode stack");
    }

    /// End of input: command frames unwind implicitly, open bracket frames
    /// (and whatever they sit on) stay visible.
    pub fn unwind_at_eof(&mut self) {
        while self.frames.len() > 1 && self.frames.last().is_some_and(|f| !f.bracket) {
            self.frames.pop();
        }
    }
}
