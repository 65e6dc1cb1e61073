use crate::import::{ImportEvent, ImportOutcome};
use crate::output::is_quiet;
use crate::ui::{muted, state_icon, theme, Icons};
use crossbeam::channel::{Receiver, Select};
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// One spinner per running import, stacked in a `MultiProgress`.
pub struct ProgressManager {
    mp: MultiProgress,
    visible: bool,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self::with_visibility(console::Term::stdout().is_term() && !is_quiet())
    }

    pub fn hidden() -> Self {
        Self::with_visibility(false)
    }

    fn with_visibility(visible: bool) -> Self {
        Self {
            mp: MultiProgress::new(),
            visible,
        }
    }

    /// Add a spinner for the import labelled `label`
    pub fn track(&self, label: &str) -> ImportProgress {
        let pb = if self.visible {
            let pb = self.mp.add(ProgressBar::new_spinner());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner} {prefix:.bold} {wide_msg}") {
            pb.set_style(style);
        }
        pb.set_prefix(label.to_string());
        ImportProgress {
            pb,
            finished: false,
        }
    }

    /// Drain every receiver until all imports have disconnected.
    pub fn follow_all(&self, tracked: &mut [(ImportProgress, &Receiver<ImportEvent>)]) {
        let mut open: Vec<usize> = (0..tracked.len()).collect();
        while !open.is_empty() {
            let mut select = Select::new();
            for &i in &open {
                select.recv(tracked[i].1);
            }
            let op = select.select();
            let slot = op.index();
            let idx = open[slot];
            match op.recv(tracked[idx].1) {
                Ok(event) => tracked[idx].0.handle(&event),
                Err(_) => {
                    open.remove(slot);
                }
            }
        }
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(&self, duration: Duration, packs: usize, sentences: usize, audio: usize) {
        self.clear();
        if is_quiet() {
            return;
        }
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::PACKAGE.style(theme().info.clone()),
            packs,
            Icons::GLOBE.style(theme().info.clone()),
            sentences,
            Icons::MUSIC.style(theme().info.clone()),
            audio
        );
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the events of a single import.
pub struct ImportProgress {
    pb: ProgressBar,
    finished: bool,
}

impl ImportProgress {
    pub fn handle(&mut self, event: &ImportEvent) {
        if self.finished {
            return;
        }
        match event {
            ImportEvent::StateChanged(state) => {
                self.pb
                    .set_message(format!("{} {}", state_icon(*state), muted(state.as_str())));
            }
            ImportEvent::Notification(message) => {
                self.pb.set_message(message.clone());
            }
            ImportEvent::Error(err) => {
                self.finished = true;
                self.pb.abandon_with_message(format!(
                    "{} {}",
                    Icons::CROSS,
                    err.to_string().style(theme().error.clone())
                ));
            }
            ImportEvent::Finished(ImportOutcome::Completed(report)) => {
                self.finished = true;
                self.pb.finish_with_message(format!(
                    "{} {} sentences, {} audio files",
                    Icons::CHECK,
                    report.sentences,
                    report.audio_copied
                ));
            }
            ImportEvent::Finished(ImportOutcome::Failed(err)) => {
                self.finished = true;
                self.pb.abandon_with_message(format!("{} {}", Icons::CROSS, err));
            }
        }
    }

    /// Render `events` until the sender disconnects
    pub fn follow(&mut self, events: &Receiver<ImportEvent>) {
        for event in events.iter() {
            self.handle(&event);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportError, ImportState};
    use crossbeam::channel;

    #[test]
    fn test_error_finishes_progress() {
        let manager = ProgressManager::hidden();
        let mut progress = manager.track("en_basics.pack");
        progress.handle(&ImportEvent::StateChanged(ImportState::ExtractingMetadata));
        assert!(!progress.is_finished());

        progress.handle(&ImportEvent::Error(ImportError::UnreadableSource("gone".to_string())));
        assert!(progress.is_finished());
    }

    #[test]
    fn test_follow_all_drains_every_receiver() {
        let manager = ProgressManager::hidden();
        let (tx_a, rx_a) = channel::unbounded();
        let (tx_b, rx_b) = channel::unbounded();

        tx_a.send(ImportEvent::Notification("Reading sentence: 1".to_string())).unwrap();
        tx_b.send(ImportEvent::Error(ImportError::MalformedName("x".to_string()))).unwrap();
        drop(tx_a);
        drop(tx_b);

        let mut tracked = vec![(manager.track("a"), &rx_a), (manager.track("b"), &rx_b)];
        manager.follow_all(&mut tracked);

        assert!(!tracked[0].0.is_finished());
        assert!(tracked[1].0.is_finished());
        assert!(rx_a.is_empty() && rx_b.is_empty());
    }
}
