use colored::Colorize;
use deckopt_core::ProgressObserver;

/// Prints a progress line to stderr roughly every `percent_step` percent.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleProgress {
    percent_step: usize,
}

impl ConsoleProgress {
    pub const fn new(percent_step: usize) -> Self {
        Self { percent_step }
    }

    fn should_report(&self, done: usize, total: usize) -> bool {
        if done == total {
            return true;
        }
        let step = (total * self.percent_step.max(1) / 100).max(1);
        done % step == 0
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ProgressObserver for ConsoleProgress {
    fn batch_started(&self, label: &str, total: usize) {
        eprintln!("{} {} ({total} simulations)", "▶".cyan(), label.bold());
    }

    fn completed(&self, done: usize, total: usize) {
        if self.should_report(done, total) {
            eprintln!("   {done}/{total} simulations");
        }
    }
}
