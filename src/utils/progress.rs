use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::loaders::RunStage;

/// Terminal spinner that follows a run through its stages. Hidden when `silent`.
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
    pipeline: String,
}

impl ProgressReporter {
    pub fn new_spinner(pipeline: &str, silent: bool) -> Self {
        let progress_bar = (!silent).then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_prefix(pipeline.to_string());
            pb.set_message(format!("{}", RunStage::Start));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        Self {
            progress_bar,
            pipeline: pipeline.to_string(),
        }
    }

    pub fn stage(&self, stage: RunStage, detail: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(format!("[{}] {}", stage, detail));
        }
    }

    pub fn is_silent(&self) -> bool {
        self.progress_bar.is_none()
    }

    /// Print above the spinner; nothing is printed when silent.
    pub fn println(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.println(message);
        }
    }

    pub fn finish(&self, stage: RunStage) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!("{} load {}", self.pipeline, stage));
        }
    }

    pub fn fail(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message(format!("{} load failed", self.pipeline));
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(ref pb) = self.progress_bar {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }
}
