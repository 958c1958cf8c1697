//! Progress feedback for command-line operations

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while an operation with no measurable size runs, such
/// as PBKDF2 key derivation at high iteration counts.
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a spinner for operations without known size
    pub fn new_spinner(operation: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template(&format!("{} [{{elapsed_precise}}] {{spinner}} {{msg}}", operation))
                .unwrap(),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Spinner labelled with the derivation parameters, so slow runs at
    /// least say why they are slow.
    pub fn for_derivation(operation: &str, iterations: u32) -> Self {
        let tracker = Self::new_spinner(operation);
        tracker.set_message(&format!("{} PBKDF2 iterations", iterations));
        tracker
    }

    /// Set message for spinner
    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Mark operation as finished
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Mark operation as finished and clear
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_spinner() {
        let tracker = ProgressTracker::new_spinner("Encrypting");

        tracker.set_message("Working...");
        thread::sleep(Duration::from_millis(50));

        tracker.finish("Done");
    }

    #[test]
    fn test_derivation_spinner() {
        let tracker = ProgressTracker::for_derivation("Deriving key", 300_000);
        thread::sleep(Duration::from_millis(20));
        tracker.finish_and_clear();
    }
}
