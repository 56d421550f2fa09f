use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const PULSE_MIN_OPACITY: f32 = 0.3;
pub const PULSE_MAX_OPACITY: f32 = 0.8;
/// Duration of one fade leg; a full cycle is two legs.
pub const PULSE_LEG: Duration = Duration::from_millis(800);
const PULSE_FRAME: Duration = Duration::from_millis(16);

/// Opacity of the loading dots `elapsed` after the pulse started.
///
/// Rises linearly from the minimum to the maximum over one leg, then falls
/// back over the next.
pub fn pulse_opacity(elapsed: Duration) -> f32 {
    let leg = PULSE_LEG.as_secs_f32();
    let phase = elapsed.as_secs_f32() % (2.0 * leg);
    let progress = if phase <= leg {
        phase / leg
    } else {
        2.0 - phase / leg
    };
    PULSE_MIN_OPACITY + (PULSE_MAX_OPACITY - PULSE_MIN_OPACITY) * progress
}

/// Frame timer driving the loading indicator while a reply is outstanding.
pub struct LoadingPulse {
    opacity: Arc<watch::Sender<f32>>,
    task: Option<JoinHandle<()>>,
}

impl LoadingPulse {
    pub fn new() -> Self {
        let (opacity, _) = watch::channel(PULSE_MIN_OPACITY);
        Self {
            opacity: Arc::new(opacity),
            task: None,
        }
    }

    /// Receiver the view reads the current opacity from.
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.opacity.subscribe()
    }

    pub fn opacity(&self) -> f32 {
        *self.opacity.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts the timer. Must be called inside a tokio runtime; no-op if running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let opacity = Arc::clone(&self.opacity);
        self.task = Some(tokio::spawn(async move {
            let started_at = Instant::now();
            let mut frames = tokio::time::interval(PULSE_FRAME);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                frames.tick().await;
                opacity.send_replace(pulse_opacity(started_at.elapsed()));
            }
        }));
        tracing::trace!("loading pulse started");
    }

    /// Cancels the timer and resets the opacity. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::trace!("loading pulse stopped");
        }
        self.opacity.send_replace(PULSE_MIN_OPACITY);
    }
}

impl Default for LoadingPulse {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LoadingPulse {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
