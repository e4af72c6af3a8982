//! Session-wide settings and starting over.

use super::{Pipeline, Session};
use crate::types::{Event, TargetPreset};

impl Pipeline {
    /// Current target size in KB
    pub async fn target_kb(&self) -> u64 {
        self.session.read().await.target_kb
    }

    /// Upper bound of the target range in KB
    ///
    /// Starts at `target.default_max_kb` and grows to the size of the largest file
    /// uploaded in this session.
    pub async fn max_kb(&self) -> u64 {
        self.session.read().await.max_kb
    }

    /// Set the target size, clamped to `[target.min_target_kb, max_kb]`
    ///
    /// Returns the target actually applied. Only affects orchestration runs started
    /// afterwards.
    pub async fn set_target_kb(&self, target_kb: u64) -> u64 {
        let min = self.config.target.min_target_kb;
        let applied = {
            let mut session = self.session.write().await;
            let max = session.max_kb.max(min);
            session.target_kb = target_kb.clamp(min, max);
            session.target_kb
        };

        if applied != target_kb {
            tracing::debug!(requested = target_kb, applied, "target size clamped");
        }
        self.emit_event(Event::TargetChanged {
            target_kb: applied,
        });
        applied
    }

    /// Set the target size from a preset
    pub async fn apply_preset(&self, preset: TargetPreset) -> u64 {
        let max_kb = self.max_kb().await;
        self.set_target_kb(preset.resolve(max_kb)).await
    }

    /// Clear the session and start over
    ///
    /// Every record is dropped, every ticker stopped, and every upload or compress
    /// request still in flight is abandoned: its result will not be applied. Target
    /// and maximum size return to their configured defaults. Returns the new
    /// generation number.
    pub async fn reset(&self) -> u64 {
        let (generation, dropped) = {
            let mut session = self.session.write().await;
            session.cancel.cancel();
            let generation = session.generation + 1;
            let dropped = session.registry.len();
            *session = Session::new(generation, &self.config.target);
            (generation, dropped)
        };

        let stopped = self.stop_all_tickers().await;
        tracing::info!(generation, dropped, stopped_tickers = stopped, "session reset");
        self.emit_event(Event::SessionReset { generation });
        generation
    }
}
