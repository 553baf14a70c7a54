//! Console output with a single overwritable status line.

use colored::Colorize;
use std::io::{self, Write};

/// Moves up one line, clears it, and moves up again; the newline that
/// follows lands the cursor at the start of the cleared line.
pub const ERASE_LINE: &str = "\x1b[1A\x1b[2K\x1b[1A";

/// Writes harness output and tracks whether a status line is on screen.
pub struct StatusConsole {
    out: Box<dyn Write>,
    temp_line_printed: bool,
    overwrite: bool,
}

impl StatusConsole {
    /// With `overwrite` off (verbose mode) status lines are left in place.
    pub fn new(out: Box<dyn Write>, overwrite: bool) -> Self {
        Self {
            out,
            temp_line_printed: false,
            overwrite,
        }
    }

    pub fn stdout(overwrite: bool) -> Self {
        Self::new(Box::new(io::stdout()), overwrite)
    }

    pub fn temp_line_printed(&self) -> bool {
        self.temp_line_printed
    }

    /// Print a permanent line. Console write errors are not test failures.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
        let _ = self.out.flush();
    }

    /// Replace any status line with `text`.
    pub fn print_temp(&mut self, text: impl AsRef<str>) {
        self.erase_temp();
        self.line(text);
        self.temp_line_printed = true;
    }

    /// Remove the status line if one is showing and overwriting is enabled.
    pub fn erase_temp(&mut self) {
        if self.temp_line_printed && self.overwrite {
            self.line(ERASE_LINE);
            self.temp_line_printed = false;
        }
    }

    /// Forget any on-screen status line without erasing it.
    pub fn reset(&mut self) {
        self.temp_line_printed = false;
    }
}

/// PASS/FAIL tag: the colored form to print and the plain form whose width
/// sets the indentation of the lines that follow.
pub fn result_tag(passed: bool) -> (String, &'static str) {
    if passed {
        ("PASS".green().to_string(), "PASS")
    } else {
        ("FAIL".red().to_string(), "FAIL")
    }
}
