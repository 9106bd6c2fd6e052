//! Progress reporting for encode, concat, and copy passes.

use indicatif::{ProgressBar, ProgressStyle};

/// A titled progress bar. Encoding advances by character count, concat and
/// copy by file count.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(title: &str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
        );
        bar.set_message(title.to_string());
        Progress { bar }
    }

    pub fn inc(&self, n: u64) {
        self.bar.inc(n);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
