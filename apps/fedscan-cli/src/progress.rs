//! Progress bars for the two-sided inventory fetch
//!
//! One bar per side, driven by the reconciler's progress callback.

use fedscan_recon::{Progress, Side};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;

pub struct FetchProgress {
    multi: MultiProgress,
    left: ProgressBar,
    right: ProgressBar,
}

impl FetchProgress {
    pub fn new(left_label: &str, right_label: &str) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::default_bar()
            .template("{msg:<28} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░");

        let left = multi.add(ProgressBar::new(0));
        left.set_style(style.clone());
        left.set_message(left_label.to_string());

        let right = multi.add(ProgressBar::new(0));
        right.set_style(style);
        right.set_message(right_label.to_string());

        Self { multi, left, right }
    }

    /// Callback handed to [`fedscan_recon::Reconciler::with_progress`].
    pub fn hook(&self) -> Arc<dyn Fn(Side, Progress) + Send + Sync> {
        let left = self.left.clone();
        let right = self.right.clone();
        Arc::new(move |side, progress| {
            let bar = match side {
                Side::Left => &left,
                Side::Right => &right,
            };
            bar.set_length(progress.total);
            bar.set_position(progress.fetched);
        })
    }

    pub fn finish(&self) {
        self.left.finish_and_clear();
        self.right.finish_and_clear();
        let _ = self.multi.clear();
    }
}
