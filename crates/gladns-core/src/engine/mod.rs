//! Tick-driven sync engine
//!
//! The SyncEngine is responsible for:
//! - Connecting the selected connector (fatal on failure)
//! - Polling the state source on a fixed interval
//! - Handing each fresh node state to the connector for reconciliation
//! - Reporting tick results for monitoring/logging
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   NodeState    ┌──────────────┐  update_state  ┌─────────────┐
//! │ StateSource │───────────────▶│  SyncEngine  │───────────────▶│  Connector  │
//! └─────────────┘                └──────────────┘                └─────────────┘
//!                                        │
//!                                        ▼
//!                                 ┌─────────────┐
//!                                 │   Events    │
//!                                 └─────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Interval fires
//! 2. Fetch desired state from the StateSource
//! 3. Call Connector::update_state()
//! 4. Log and emit the outcome
//!
//! A tick runs to completion before the next one starts. When a tick takes
//! longer than the interval the next one is delayed, never overlapped.
//! Gateway and reconciliation failures end only the current tick.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::reconcile::ReconcileReport;
use crate::traits::{Connector, StateSource};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Connector connected and the tick loop started
    Started {
        connector: String,
    },

    /// A tick reconciled successfully (possibly with isolated failures)
    TickCompleted {
        tick: u64,
        created: usize,
        updated: usize,
        unchanged: usize,
        failed: usize,
    },

    /// A tick could not be completed
    TickFailed {
        tick: u64,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Tick-driven sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Start with [`SyncEngine::run()`]
/// 3. Engine runs until a shutdown signal is received or a fatal error occurs
pub struct SyncEngine {
    /// Source of desired node state
    source: Box<dyn StateSource>,

    /// Connector for the selected DNS backend
    connector: Box<dyn Connector>,

    /// Time between two ticks
    tick_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `source`: State source implementation
    /// - `connector`: Connector for the selected backend (connected or not)
    /// - `config`: Engine configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn StateSource>,
        connector: Box<dyn Connector>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            source,
            connector,
            tick_interval: config.tick_interval(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The connector driven by this engine
    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// Run the engine until SIGINT
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error (connect failed)
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// Embedders and tests use this instead of OS signals.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    /// Perform one poll-then-reconcile pass
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: Per-address outcomes
    /// - `Err(Error)`: The state could not be fetched, or reconciliation failed as a whole
    pub async fn tick(&self) -> Result<ReconcileReport> {
        let desired = self.source.fetch().await?;
        debug!(
            "Fetched {} node(s) from {}",
            desired.len(),
            self.source.describe()
        );

        self.connector.update_state(&desired).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        if !self.connector.is_connected() {
            if let Err(e) = self.connector.connect().await {
                error!("Failed to connect {}: {}", self.connector.name(), e);
                self.emit_event(EngineEvent::Stopped {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        }

        self.emit_event(EngineEvent::Started {
            connector: self.connector.name().to_string(),
        });
        info!(
            "Syncing {} from {} every {:?}",
            self.connector.name(),
            self.source.describe(),
            self.tick_interval
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut tick: u64 = 0;
        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    tick += 1;
                    if let Err(e) = self.run_tick(tick).await {
                        self.emit_event(EngineEvent::Stopped {
                            reason: e.to_string(),
                        });
                        return Err(e);
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        info!("Engine stopped after {} tick(s)", tick);
        Ok(())
    }

    /// Run one tick and report it
    ///
    /// Only fatal errors are returned; everything else is logged and the
    /// loop continues with the next tick.
    async fn run_tick(&self, tick: u64) -> Result<()> {
        match self.tick().await {
            Ok(report) => {
                if report.writes() > 0 || report.failed() > 0 {
                    info!("Tick {}: {}", tick, report);
                } else {
                    debug!("Tick {}: {}", tick, report);
                }

                self.emit_event(EngineEvent::TickCompleted {
                    tick,
                    created: report.created(),
                    updated: report.updated(),
                    unchanged: report.unchanged(),
                    failed: report.failed(),
                });
                Ok(())
            }
            Err(e) => {
                error!("Tick {} failed: {}", tick, e);
                self.emit_event(EngineEvent::TickFailed {
                    tick,
                    error: e.to_string(),
                });

                if e.is_fatal() { Err(e) } else { Ok(()) }
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
