//! CLI presenter for output formatting

use std::io::{self, Write};
use std::time::Duration as StdDuration;

use chrono::Local;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::audio::LevelSample;
use crate::domain::recording::RecorderState;
use crate::domain::recovery::RecoveredRecording;

/// Width of the level bar in cells
const LEVEL_WIDTH: usize = 24;

/// Glyphs for spectrum bars, quietest first
const SPECTRUM_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(StdDuration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Start the live recording line
    pub fn start_meter(&mut self) {
        let line = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            line.set_style(style);
        }
        self.spinner = Some(line);
    }

    /// Redraw the live recording line
    pub fn update_meter(&self, state: RecorderState, elapsed: StdDuration, sample: Option<&LevelSample>) {
        self.update_spinner(&self.format_meter(state, elapsed, sample));
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.println_err(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.println_err(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.println_err(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.println_err(format!("{} {}", "✗".red(), message));
    }

    /// Print a line to stderr without tearing an active progress line
    fn println_err(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }

    /// Output text to stdout (command results)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a question to stderr and leave the cursor on the same line
    pub fn prompt(&self, question: &str) {
        eprint!("{} {} ", "?".magenta(), question);
        let _ = io::stderr().flush();
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print the recording controls
    pub fn controls_hint(&self) {
        self.info("Controls: p+Enter pause/resume, s+Enter or Ctrl-C stop, x+Enter discard");
    }

    /// Print recoverable recordings as a table on stdout
    pub fn recovered_list(&self, recordings: &[RecoveredRecording]) {
        if recordings.is_empty() {
            self.info("No recoverable recordings");
            return;
        }
        let header = format!(
            "{:<12} {:<11} {:>8} {:>7}  {}",
            "ID", "SOURCE", "LENGTH", "CHUNKS", "LAST WRITTEN"
        );
        println!("{}", header.bold());
        for recording in recordings {
            println!("{}", format_recovered_row(recording));
        }
    }

    /// Format the live recording line
    pub fn format_meter(
        &self,
        state: RecorderState,
        elapsed: StdDuration,
        sample: Option<&LevelSample>,
    ) -> String {
        let badge = match state {
            RecorderState::Recording => "● REC".red().bold(),
            RecorderState::Paused => "❚❚ PAUSED".yellow().bold(),
            RecorderState::RequestingPermission => "… OPENING".cyan(),
            RecorderState::Stopped => "■ STOPPED".normal(),
            RecorderState::Idle => "○ IDLE".normal(),
        };
        let clock = format_clock(elapsed);
        match sample {
            Some(sample) => format!("{} {} {}", badge, clock, render_level(sample)),
            None => format!("{} {}", badge, clock),
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// `mm:ss`, or `h:mm:ss` past the hour
pub fn format_clock(elapsed: StdDuration) -> String {
    let total = elapsed.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Draw one meter reading
pub fn render_level(sample: &LevelSample) -> String {
    match sample {
        LevelSample::Level(value) => {
            let filled = (value.clamp(0.0, 1.0) * LEVEL_WIDTH as f32).round() as usize;
            format!(
                "[{}{}]",
                "█".repeat(filled).green(),
                "░".repeat(LEVEL_WIDTH - filled)
            )
        }
        LevelSample::Spectrum(bars) => {
            let top = SPECTRUM_GLYPHS.len() - 1;
            let line: String = bars
                .iter()
                .map(|v| SPECTRUM_GLYPHS[(v.clamp(0.0, 1.0) * top as f32).round() as usize])
                .collect();
            format!("[{}]", line.green())
        }
    }
}

fn format_recovered_row(recording: &RecoveredRecording) -> String {
    format!(
        "{:<12} {:<11} {:>8} {:>7}  {}",
        recording.id.short(),
        recording.source.as_str(),
        recording.duration_label(),
        recording.chunk_count,
        recording
            .updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats() {
        assert_eq!(format_clock(StdDuration::from_secs(0)), "00:00");
        assert_eq!(format_clock(StdDuration::from_millis(65_900)), "01:05");
        assert_eq!(format_clock(StdDuration::from_secs(3723)), "1:02:03");
    }

    #[test]
    fn level_bar_fills_proportionally() {
        colored::control::set_override(false);
        let empty = render_level(&LevelSample::Level(0.0));
        let full = render_level(&LevelSample::Level(1.0));
        let half = render_level(&LevelSample::Level(0.5));

        assert_eq!(empty.matches('█').count(), 0);
        assert_eq!(full.matches('█').count(), LEVEL_WIDTH);
        assert_eq!(half.matches('█').count(), LEVEL_WIDTH / 2);
        assert_eq!(half.chars().count(), LEVEL_WIDTH + 2);
    }

    #[test]
    fn spectrum_draws_one_glyph_per_bar() {
        colored::control::set_override(false);
        let line = render_level(&LevelSample::Spectrum(vec![0.0, 0.5, 1.0, 2.0]));
        assert_eq!(line, "[▁▅██]");
    }

    #[test]
    fn meter_shows_state_and_clock() {
        colored::control::set_override(false);
        let presenter = Presenter::new();
        let line = presenter.format_meter(
            RecorderState::Paused,
            StdDuration::from_secs(12),
            Some(&LevelSample::Level(0.0)),
        );
        assert!(line.contains("PAUSED"));
        assert!(line.contains("00:12"));
    }
}
