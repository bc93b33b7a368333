//! Tokio actor hosting one engine.
//!
//! The actor task is the only owner of its engine. Player commands, timer
//! ticks and completed supply/recorder calls all arrive as messages and are
//! applied one at a time, so every engine operation runs to completion
//! without interleaving.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

use crate::engine::{Effect, GameEngine, TokioScheduler};
use crate::error::{HostError, RecorderError, SupplyError};
use crate::metrics::GAME_SESSIONS_ACTIVE;
use crate::models::Question;
use crate::services::question_supply::QuestionSupply;
use crate::services::session_recorder::SessionRecorder;

const COMMAND_BUFFER: usize = 32;

type Operation<E> = Box<dyn FnOnce(&mut E) -> Option<Effect> + Send>;

struct Command<E: GameEngine> {
    op: Operation<E>,
    reply: oneshot::Sender<E::Snapshot>,
}

enum Completion {
    Generated {
        epoch: u64,
        result: Result<Vec<Question>, SupplyError>,
    },
    Recorded {
        epoch: u64,
        outcome: Result<(), RecorderError>,
    },
}

#[derive(Clone)]
pub struct HostServices {
    pub supply: Arc<dyn QuestionSupply>,
    pub recorder: Arc<dyn SessionRecorder>,
    pub tick_interval: Duration,
    pub recorder_timeout: Duration,
}

/// Handle to a hosted engine. Dropping every handle stops the actor.
pub struct GameHost<E: GameEngine> {
    commands: mpsc::Sender<Command<E>>,
    snapshots: watch::Receiver<E::Snapshot>,
}

impl<E: GameEngine> Clone for GameHost<E> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<E: GameEngine> GameHost<E> {
    /// Spawns the actor. `build` receives the real-time scheduler the engine
    /// must use for its timers.
    pub fn spawn<F>(services: HostServices, build: F) -> Self
    where
        F: FnOnce(TokioScheduler) -> E,
    {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let engine = build(TokioScheduler::new(services.tick_interval, ticks_tx));
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

        let actor = Actor {
            engine,
            services,
            snapshots: snapshot_tx,
            completions: completions_tx,
        };
        tokio::spawn(actor.run(commands_rx, ticks_rx, completions_rx));

        Self {
            commands: commands_tx,
            snapshots: snapshot_rx,
        }
    }

    /// Applies `op` inside the actor and returns the snapshot taken right after.
    pub async fn run<F>(&self, op: F) -> Result<E::Snapshot, HostError>
    where
        F: FnOnce(&mut E) -> Option<Effect> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command {
                op: Box::new(op),
                reply: reply_tx,
            })
            .await
            .map_err(|_| HostError::Closed)?;
        reply_rx.await.map_err(|_| HostError::Closed)
    }

    pub fn snapshot(&self) -> E::Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<E::Snapshot> {
        self.snapshots.clone()
    }
}

struct Actor<E: GameEngine> {
    engine: E,
    services: HostServices,
    snapshots: watch::Sender<E::Snapshot>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<E: GameEngine> Actor<E> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command<E>>,
        mut ticks: mpsc::UnboundedReceiver<u64>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        let mode = self.engine.mode().as_str();
        GAME_SESSIONS_ACTIVE.with_label_values(&[mode]).inc();
        tracing::info!("Game host started: mode={}", mode);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(Command { op, reply }) = command else {
                        break;
                    };
                    let effect = op(&mut self.engine);
                    self.apply(effect);
                    let _ = reply.send(self.engine.snapshot());
                }
                Some(token) = ticks.recv() => {
                    if self.engine.active_timer() == Some(token) {
                        let effect = self.engine.tick();
                        self.apply(effect);
                    } else {
                        tracing::debug!("Dropping tick from retired timer {}", token);
                        continue;
                    }
                }
                Some(completion) = completions.recv() => {
                    let effect = match completion {
                        Completion::Generated { epoch, result } => {
                            self.engine.complete_generation(epoch, result)
                        }
                        Completion::Recorded { epoch, outcome } => {
                            self.engine.complete_recording(epoch, outcome);
                            None
                        }
                    };
                    self.apply(effect);
                }
            }
            self.snapshots.send_replace(self.engine.snapshot());
        }

        self.engine.reset();
        GAME_SESSIONS_ACTIVE.with_label_values(&[mode]).dec();
        tracing::info!("Game host stopped: mode={}", mode);
    }

    fn apply(&self, effect: Option<Effect>) {
        match effect {
            None => {}
            Some(Effect::FetchQuestions(pending)) => {
                let supply = self.services.supply.clone();
                let completions = self.completions.clone();
                tokio::spawn(async move {
                    let result = supply.fetch(&pending.request).await;
                    let _ = completions.send(Completion::Generated {
                        epoch: pending.epoch,
                        result,
                    });
                });
            }
            Some(Effect::RecordResult(pending)) => {
                let recorder = self.services.recorder.clone();
                let completions = self.completions.clone();
                let timeout = self.services.recorder_timeout;
                tokio::spawn(async move {
                    let outcome =
                        match tokio::time::timeout(timeout, recorder.record_result(&pending.result))
                            .await
                        {
                            Ok(outcome) => outcome,
                            Err(_) => Err(RecorderError::Timeout(timeout.as_millis() as u64)),
                        };
                    let _ = completions.send(Completion::Recorded {
                        epoch: pending.epoch,
                        outcome,
                    });
                });
            }
        }
    }
}
