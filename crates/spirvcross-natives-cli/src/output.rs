//! Colored status output.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled stdout writer.
pub struct StyledOutput {
    stdout: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn badge(&mut self, label: &str, bg: Color, fg: Color) {
        let mut spec = ColorSpec::new();
        spec.set_bg(Some(bg)).set_fg(Some(fg)).set_bold(true);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, " {} ", label);
        let _ = self.stdout.reset();
        let _ = write!(self.stdout, " ");
    }

    /// " OK " badge.
    pub fn ok_badge(&mut self) {
        self.badge("OK", Color::Green, Color::White);
    }

    /// " FAIL " badge.
    pub fn fail_badge(&mut self) {
        self.badge("FAIL", Color::Red, Color::White);
    }

    /// " SKIP " badge.
    pub fn skip_badge(&mut self) {
        self.badge("SKIP", Color::Yellow, Color::Black);
    }

    /// Text followed by a newline, with a foreground color.
    pub fn line(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Plain line.
    pub fn plain(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}
