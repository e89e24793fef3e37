//! Terminal progress for the CLI: spinner stages and a per-file batch bar.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::batch::{BatchEvent, FileStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Progress display for a batch of `total` files.
    pub fn batch_progress(&self, total: usize) -> BatchProgress {
        let bar = self.use_pretty().then(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            let style = ProgressStyle::with_template(
                "{spinner} [{bar:30}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
            bar.set_style(style);
            bar
        });
        BatchProgress { bar, total }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

pub struct BatchProgress {
    bar: Option<ProgressBar>,
    total: usize,
}

impl BatchProgress {
    /// Reflect a batch event on the terminal.
    pub fn observe(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { index, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(format!("file {}", index + 1));
                }
            }
            BatchEvent::Completed {
                index,
                result,
                progress,
                ..
            }
            | BatchEvent::Failed {
                index,
                result,
                progress,
            } => {
                let outcome = match result.status {
                    FileStatus::Error => "error".to_string(),
                    _ if result.detections.is_empty() => "no traffic lights".to_string(),
                    _ => format!("{} detections", result.detections.len()),
                };
                match &self.bar {
                    Some(bar) => {
                        bar.set_position((index + 1) as u64);
                        bar.set_message(format!("{} ({})", result.name, outcome));
                    }
                    None => eprintln!(
                        "[{}/{}] {:>5.1}% {} ({})",
                        index + 1,
                        self.total,
                        progress,
                        result.name,
                        outcome
                    ),
                }
            }
            BatchEvent::Finished { cancelled } => {
                let message = if *cancelled {
                    "batch cancelled"
                } else {
                    "batch complete"
                };
                match &self.bar {
                    Some(bar) if *cancelled => bar.abandon_with_message(message),
                    Some(bar) => bar.finish_with_message(message),
                    None => eprintln!("==> {message}"),
                }
            }
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_never_pretty() {
        let ui = Ui::from_args(Some("plain"), true, false);
        assert!(!ui.use_pretty());
        let ui = Ui::from_args(Some("pretty"), false, false);
        assert!(!ui.use_pretty());
        let ui = Ui::from_args(None, true, false);
        assert!(ui.use_pretty());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
