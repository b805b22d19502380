//! Terminal output: prefixed log lines and a block of phase progress bars.
//!
//! | Prefix            | Colour  |
//! |-------------------|---------|
//! | `error`           | red     |
//! | `warn`, `deps`    | magenta |
//! | `build`           | green   |
//! | anything else     | yellow  |
//!
//! While a `ProgressBars` block is on screen, `log!` lines are printed above
//! it and the block is redrawn underneath.
//!
//! ```ignore
//! log!("build"; "rendering {} documents", count);
//!
//! if let Some(progress) = ProgressBars::new_filtered(&[("documents", 100), ("static", 50)]) {
//!     progress.inc_by_name("documents");
//!     progress.finish();
//! }
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType, size},
};
use parking_lot::Mutex;
use std::io::{Write, stdout};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Columns assumed when stdout is not a terminal.
const FALLBACK_WIDTH: usize = 120;

const BAR_MIN: usize = 10;
const BAR_MAX: usize = 40;

/// Shared terminal state. Holding the lock serializes every write.
static SCREEN: LazyLock<Mutex<Screen>> = LazyLock::new(|| {
    let width = size().map_or(FALLBACK_WIDTH, |(w, _)| usize::from(w));
    Mutex::new(Screen {
        width,
        reserved: 0,
    })
});

struct Screen {
    width: usize,
    /// Lines below the cursor-home owned by the progress block.
    reserved: u16,
}

impl Screen {
    /// Move to the top of the progress block and clear it.
    fn lift(&self, out: &mut impl Write) {
        if self.reserved > 0 {
            queue!(out, cursor::MoveUp(self.reserved), Clear(ClearType::FromCursorDown)).ok();
        }
    }
}

/// Log a message with a coloured module prefix.
///
/// ```ignore
/// log!("deps"; "{} documents affected", list.len());
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Print `message` under a coloured `[module]` prefix.
///
/// Single-line messages are cut to the terminal width.
pub fn log(module: &str, message: &str) {
    let screen = SCREEN.lock();
    let mut out = stdout().lock();
    screen.lift(&mut out);

    let room = screen.width.saturating_sub(prefix_width(module));
    let message = if message.contains('\n') {
        message
    } else {
        clip(message, room)
    };
    writeln!(out, "{} {message}", prefix(module)).ok();

    // Leave blank lines for the block; the next bar update repaints it.
    for _ in 0..screen.reserved {
        writeln!(out).ok();
    }
    out.flush().ok();
}

// ============================================================================
// Progress Bars
// ============================================================================

/// One progress line per build phase, repainted as a block.
///
/// Phases are addressed by the name they were created with; updates may come
/// from any worker thread.
pub struct ProgressBars {
    phases: Vec<Phase>,
}

struct Phase {
    name: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl ProgressBars {
    /// Reserve one line per `(phase, total)` pair.
    pub fn new(phases: &[(&'static str, usize)]) -> Self {
        let bars = Self {
            phases: phases
                .iter()
                .map(|&(name, total)| Phase {
                    name,
                    total,
                    done: AtomicUsize::new(0),
                })
                .collect(),
        };

        let mut screen = SCREEN.lock();
        let mut out = stdout().lock();
        screen.lift(&mut out);
        screen.reserved = u16::try_from(bars.phases.len()).unwrap_or(u16::MAX);
        bars.paint(&screen, &mut out);
        bars
    }

    /// Like `new`, minus empty phases. `None` when there is at most one item
    /// across all phases.
    pub fn new_filtered(phases: &[(&'static str, usize)]) -> Option<Self> {
        let kept: Vec<_> = phases.iter().copied().filter(|&(_, total)| total > 0).collect();
        let items: usize = kept.iter().map(|&(_, total)| total).sum();
        (items > 1).then(|| Self::new(&kept))
    }

    /// Advance the phase called `name`. Unknown names are ignored.
    pub fn inc_by_name(&self, name: &str) {
        let Some(phase) = self.phases.iter().find(|phase| phase.name == name) else {
            return;
        };
        phase.done.fetch_add(1, Ordering::Relaxed);

        let screen = SCREEN.lock();
        if screen.reserved == 0 {
            return;
        }
        let mut out = stdout().lock();
        screen.lift(&mut out);
        self.paint(&screen, &mut out);
    }

    /// Erase the block. Later calls do nothing.
    pub fn finish(&self) {
        let mut screen = SCREEN.lock();
        if screen.reserved == 0 {
            return;
        }
        let mut out = stdout().lock();
        screen.lift(&mut out);
        out.flush().ok();
        screen.reserved = 0;
    }

    fn paint(&self, screen: &Screen, out: &mut impl Write) {
        for phase in &self.phases {
            let line = phase.line(screen.width);
            writeln!(out, "{} {line}", prefix(phase.name)).ok();
        }
        out.flush().ok();
    }
}

impl Phase {
    /// `[████░░░░] 42/100`, sized to fit next to the prefix.
    fn line(&self, width: usize) -> String {
        let done = self.done.load(Ordering::Relaxed).min(self.total);
        let count = format!("{done}/{}", self.total);
        let used = prefix_width(self.name) + count.len() + 3;
        let cells = width.saturating_sub(used).clamp(BAR_MIN, BAR_MAX);
        let filled = if self.total == 0 {
            0
        } else {
            done * cells / self.total
        };
        format!("[{}{}] {count}", "█".repeat(filled), "░".repeat(cells - filled))
    }
}

impl Drop for ProgressBars {
    fn drop(&mut self) {
        self.finish();
    }
}

// ============================================================================
// Helpers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tint {
    Red,
    Magenta,
    Green,
    Yellow,
}

fn tint(module: &str) -> Tint {
    match module.to_ascii_lowercase().as_str() {
        "error" => Tint::Red,
        "warn" | "deps" => Tint::Magenta,
        "build" => Tint::Green,
        _ => Tint::Yellow,
    }
}

fn prefix(module: &str) -> ColoredString {
    let tag = format!("[{module}]");
    match tint(module) {
        Tint::Red => tag.bright_red().bold(),
        Tint::Magenta => tag.bright_magenta().bold(),
        Tint::Green => tag.bright_green().bold(),
        Tint::Yellow => tag.bright_yellow().bold(),
    }
}

/// Columns taken by `[module] `.
const fn prefix_width(module: &str) -> usize {
    module.len() + 3
}

/// Longest prefix of `s` within `max` bytes, cut on a char boundary.
fn clip(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_width() {
        assert_eq!(prefix_width("deps"), 7);
        assert_eq!(prefix_width(""), 3);
    }

    #[test]
    fn test_tints() {
        assert_eq!(tint("error"), Tint::Red);
        assert_eq!(tint("ERROR"), Tint::Red);
        assert_eq!(tint("deps"), Tint::Magenta);
        assert_eq!(tint("build"), Tint::Green);
        assert_eq!(tint("static"), Tint::Yellow);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello world", 5), "hello");
        assert_eq!(clip("hello", 0), "");
        // "€" is three bytes
        assert_eq!(clip("a€b", 3), "a");
        assert_eq!(clip("a€b", 4), "a€");
    }

    #[test]
    fn test_phase_line() {
        let phase = Phase {
            name: "documents",
            total: 4,
            done: AtomicUsize::new(2),
        };
        let line = phase.line(80);
        assert!(line.ends_with("] 2/4"));
        assert_eq!(line.matches('█').count(), line.matches('░').count());

        let empty = Phase {
            name: "static",
            total: 0,
            done: AtomicUsize::new(0),
        };
        assert!(empty.line(80).ends_with("] 0/0"));
    }

    #[test]
    fn test_new_filtered_skips_trivial_work() {
        assert!(ProgressBars::new_filtered(&[("documents", 1), ("static", 0)]).is_none());
        assert!(ProgressBars::new_filtered(&[("documents", 0)]).is_none());
    }
}
