//! Single-threaded game state machines.
//!
//! Engines never perform I/O. An operation that needs the outside world
//! returns an [`Effect`] tagged with the engine's current epoch; the caller
//! runs it and feeds the outcome back through `complete_*`. Every new session
//! and every reset bumps the epoch, so late outcomes of a discarded session
//! are recognised and ignored.

pub mod arcade;
pub mod ghost;
pub mod quiz;
pub mod scoring;
pub mod timer;

use serde::Serialize;

use crate::error::{RecorderError, SupplyError};
use crate::metrics::STALE_RESULTS_DISCARDED_TOTAL;
use crate::models::{GameMode, Question, SessionResult, SupplyRequest};

pub use arcade::{ArcadeEngine, ArcadeRules, STARTING_LIVES};
pub use ghost::{GhostPolicy, PacedGhost};
pub use quiz::{QuizEngine, QuizRules};
pub use scoring::ScoringRules;
pub use timer::{ManualScheduler, TimerHandle, TimerScheduler, TimerSlot, TokioScheduler};

#[derive(Debug, Clone, PartialEq)]
pub struct PendingGeneration {
    pub epoch: u64,
    pub request: SupplyRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub epoch: u64,
    pub result: SessionResult,
}

/// Work an engine hands back to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchQuestions(PendingGeneration),
    RecordResult(PendingRecord),
}

/// Narrow interface shared by the game modes.
pub trait GameEngine: Send + 'static {
    type Snapshot: Clone + Serialize + Send + Sync + 'static;

    fn mode(&self) -> GameMode;
    fn epoch(&self) -> u64;
    fn is_active(&self) -> bool;

    /// Token of the timer currently allowed to tick this engine.
    fn active_timer(&self) -> Option<u64>;

    fn tick(&mut self) -> Option<Effect>;
    fn submit_answer(&mut self, option: &str) -> Option<Effect>;

    fn complete_generation(
        &mut self,
        epoch: u64,
        result: Result<Vec<Question>, SupplyError>,
    ) -> Option<Effect>;
    fn complete_recording(&mut self, epoch: u64, outcome: Result<(), RecorderError>);

    fn reset(&mut self);
    fn snapshot(&self) -> Self::Snapshot;
}

/// True when an async outcome belongs to an older session.
pub(crate) fn is_stale(mode: GameMode, current: u64, incoming: u64, kind: &str) -> bool {
    if current == incoming {
        return false;
    }
    tracing::warn!(
        "Discarding stale {} result: mode={}, epoch={}, current_epoch={}",
        kind,
        mode.as_str(),
        incoming,
        current
    );
    STALE_RESULTS_DISCARDED_TOTAL
        .with_label_values(&[mode.as_str(), kind])
        .inc();
    true
}
