use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mlipopt::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// Terminal view of a run.
///
/// A single optimization shows a spinner whose message follows the latest BFGS step. An
/// ensemble shows a bar counting finished conformers; skipped conformers are printed above it.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that tracks state but never draws (`--quiet`).
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        pb.finish_and_clear();
        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = Arc::clone(&self.pb);
        Box::new(move |event: Progress| match pb.lock() {
            Ok(pb) => render(&pb, event),
            Err(_) => warn!("Progress display lock poisoned; dropping event."),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn render(pb: &ProgressBar, event: Progress) {
    match event {
        Progress::PhaseStart { name } => {
            pb.reset();
            pb.set_length(0);
            pb.set_style(spinner_style());
            pb.set_prefix(name);
            pb.set_message("");
            pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
        Progress::OptimizerStep { step, energy, fmax } => {
            pb.set_message(format!("step {step}: E = {energy:.6} eV, fmax = {fmax:.4} eV/Å"));
        }
        Progress::TaskStart { total_steps } => {
            pb.disable_steady_tick();
            pb.set_style(conformer_style());
            pb.set_length(total_steps);
            pb.set_position(0);
        }
        Progress::TaskIncrement => pb.inc(1),
        Progress::TaskFinish => {
            if let Some(length) = pb.length() {
                pb.set_position(length);
            }
        }
        Progress::PhaseFinish => {
            pb.disable_steady_tick();
            pb.finish_with_message("done");
        }
        Progress::Message(text) if pb.is_finished() => pb.set_message(text),
        Progress::Message(text) => pb.println(format!("  {text}")),
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn conformer_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold} [{bar:30.green/white}] {pos}/{len} conformers ({elapsed})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handler_is_idle() {
        let handler = CliProgressHandler::hidden();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn optimizer_steps_replace_the_message() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();
        callback(Progress::PhaseStart { name: "Optimize" });
        callback(Progress::OptimizerStep {
            step: 7,
            energy: -152.25,
            fmax: 0.0421,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.prefix(), "Optimize");
            assert_eq!(pb.message(), "step 7: E = -152.250000 eV, fmax = 0.0421 eV/Å");
        }

        callback(Progress::PhaseFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "done");
    }

    #[test]
    fn conformer_bar_counts_to_the_ensemble_size() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();
        callback(Progress::PhaseStart {
            name: "Optimizing conformers",
        });
        callback(Progress::TaskStart { total_steps: 12 });
        callback(Progress::TaskIncrement);
        callback(Progress::Message("conformer 3 skipped: worker exited".to_string()));
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(12));
            assert_eq!(pb.position(), 1);
            assert!(!pb.is_finished());
        }

        callback(Progress::TaskFinish);
        assert_eq!(handler.pb.lock().unwrap().position(), 12);
    }

    #[test]
    fn events_from_worker_threads_are_rendered() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| callback(Progress::TaskIncrement));
            }
        });
        assert_eq!(handler.pb.lock().unwrap().position(), 4);
    }
}
