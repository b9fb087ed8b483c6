use indicatif::{ProgressBar, ProgressStyle};
use media_stat_core::{LogLevel, SyncEvent};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use tokio::sync::mpsc::UnboundedReceiver;

/// Progress bar fed by the run's event stream
pub struct SyncProgress {
    bar: Option<ProgressBar>,
}

impl SyncProgress {
    pub fn new(enabled: bool) -> Self {
        let bar = (enabled && is_interactive()).then(|| {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ");
            bar.set_style(style);
            bar.set_message("Starting sync...");
            bar
        });

        if bar.is_none() {
            tracing::debug!(
                operation = "ui_init",
                mode = "non_interactive",
                "Progress bar disabled, relying on structured logging"
            );
        }
        Self { bar }
    }

    /// Consume events until the sender side is dropped
    pub async fn drive(self, mut events: UnboundedReceiver<SyncEvent>) {
        while let Some(event) = events.recv().await {
            let Some(bar) = &self.bar else {
                continue;
            };
            match event {
                SyncEvent::Progress(percentage) => bar.set_position(percentage.floor() as u64),
                SyncEvent::Log { level: LogLevel::Info, message } => bar.set_message(message),
                SyncEvent::Log { level: LogLevel::Warning, message } => {
                    bar.println(format!("{} {}", "⚠".yellow(), message))
                }
                SyncEvent::Log { level: LogLevel::Error, message } => {
                    bar.println(format!("{} {}", "✗".red(), message))
                }
                SyncEvent::Finished { success: true } => bar.finish_with_message("Done"),
                SyncEvent::Finished { success: false } => bar.abandon_with_message("Stopped"),
            }
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
