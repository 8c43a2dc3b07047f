//! DashboardService - the single entry point for the presentation layer.
//!
//! One worker task owns the [`Reconciler`] and processes commands from an
//! mpsc queue one at a time. Quick-fix effects wait in a [`DeferredQueue`]
//! owned by the worker; manifest analysis runs on spawned tasks whose
//! results come back through a second channel into the same loop. After
//! every mutation the full state is written through to the key-value store.
//!
//! Dropping every [`DashboardService`] handle stops the worker. Pending
//! deferred effects and in-flight analyses are dropped with it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use checklist::{Catalog, Environment};
use devstatus_agent::{build_analyzer, AgentInfo, AnalyzerError, AnalyzerMatch, ManifestAnalyzer};

use crate::config::EngineConfig;
use crate::deferred::{DeferredQueue, DeferredTask};
use crate::event::{AgentEvent, EventDraft};
use crate::export::{ExportFormat, ExportRow};
use crate::ids::{SystemClock, UuidIds};
use crate::persist::{FileKv, KvStore, MemoryKv, StatePersistence};
use crate::reconciler::{AnalysisRequest, ManualUpdate, Reconciler};
use crate::store::StatusSummary;
use crate::types::{ActivityLogEntry, EngineError, Result, StatusRecord};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    SimulateEvent {
        draft: EventDraft,
        reply: Reply<AgentEvent>,
    },
    ManualUpdate {
        update: ManualUpdate,
        reply: Reply<Option<StatusRecord>>,
    },
    AddComment {
        subcategory_id: String,
        text: String,
        reply: Reply<Option<StatusRecord>>,
    },
    SelectEnvironment {
        env: String,
        reply: Reply<Result<Environment>>,
    },
    SelectedEnvironment {
        reply: Reply<Environment>,
    },
    ExportSnapshot {
        env: Option<String>,
        reply: Reply<Result<Vec<ExportRow>>>,
    },
    Export {
        env: Option<String>,
        format: ExportFormat,
        reply: Reply<Result<String>>,
    },
    Records {
        env: Option<String>,
        reply: Reply<Result<Vec<StatusRecord>>>,
    },
    Summary {
        env: Option<String>,
        reply: Reply<Result<StatusSummary>>,
    },
    Activity {
        reply: Reply<Vec<ActivityLogEntry>>,
    },
    Agents {
        reply: Reply<Vec<AgentInfo>>,
    },
    Settle {
        reply: Reply<()>,
    },
}

/// Work finishing off the command queue.
enum Continuation {
    Analysis {
        request: AnalysisRequest,
        result: std::result::Result<Vec<AnalyzerMatch>, AnalyzerError>,
    },
}

/// Handle to the dashboard worker. Cheap to clone.
#[derive(Clone)]
pub struct DashboardService {
    commands: mpsc::Sender<Command>,
}

impl DashboardService {
    /// Start a worker around an existing reconciler.
    pub fn spawn(
        reconciler: Reconciler,
        analyzer: Arc<dyn ManifestAnalyzer>,
        persistence: Option<StatePersistence>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (cont_tx, cont_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            reconciler,
            analyzer,
            persistence,
            deferred: DeferredQueue::new(),
            continuations: cont_tx,
            in_flight: 0,
            idle_waiters: Vec::new(),
        };
        let handle = tokio::spawn(worker.run(rx, cont_rx));
        (Self { commands: tx }, handle)
    }

    /// Load state and start a worker as described by `config`.
    pub async fn start(
        config: &EngineConfig,
        catalog: Arc<Catalog>,
    ) -> Result<(Self, JoinHandle<()>)> {
        let kv: Arc<dyn KvStore> = match &config.persistence.data_dir {
            Some(dir) => Arc::new(FileKv::open(dir).await?),
            None => Arc::new(MemoryKv::new()),
        };
        let persistence = StatePersistence::new(kv, config.persistence.namespace.clone());

        let clock = Arc::new(SystemClock);
        let state = persistence
            .load(
                catalog.clone(),
                &config.project_id,
                config.activity.capacity,
                clock.as_ref(),
            )
            .await;

        let reconciler = Reconciler::new(catalog, state, config, Arc::new(UuidIds), clock)?;
        let analyzer = build_analyzer(&config.analyzer)?;
        info!(analyzer = analyzer.name(), "Dashboard service starting");

        Ok(Self::spawn(reconciler, analyzer, Some(persistence)))
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| EngineError::ServiceStopped)?;
        rx.await.map_err(|_| EngineError::ServiceStopped)
    }

    /// Submit an event against the selected environment.
    pub async fn simulate_event(&self, draft: EventDraft) -> Result<AgentEvent> {
        self.request(|reply| Command::SimulateEvent { draft, reply }).await
    }

    /// Human status change in the selected environment.
    pub async fn manual_update(&self, update: ManualUpdate) -> Result<Option<StatusRecord>> {
        self.request(|reply| Command::ManualUpdate { update, reply }).await
    }

    pub async fn add_comment(
        &self,
        subcategory_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Option<StatusRecord>> {
        let subcategory_id = subcategory_id.into();
        let text = text.into();
        self.request(|reply| Command::AddComment {
            subcategory_id,
            text,
            reply,
        })
        .await
    }

    /// Select by environment id or name.
    pub async fn select_environment(&self, env: impl Into<String>) -> Result<Environment> {
        let env = env.into();
        self.request(|reply| Command::SelectEnvironment { env, reply })
            .await?
    }

    pub async fn selected_environment(&self) -> Result<Environment> {
        self.request(|reply| Command::SelectedEnvironment { reply }).await
    }

    /// Export rows. `None` means the selected environment.
    pub async fn export_snapshot(&self, env: Option<String>) -> Result<Vec<ExportRow>> {
        self.request(|reply| Command::ExportSnapshot { env, reply })
            .await?
    }

    /// Rendered report. `None` means the selected environment.
    pub async fn export(&self, env: Option<String>, format: ExportFormat) -> Result<String> {
        self.request(|reply| Command::Export { env, format, reply })
            .await?
    }

    pub async fn records(&self, env: Option<String>) -> Result<Vec<StatusRecord>> {
        self.request(|reply| Command::Records { env, reply }).await?
    }

    pub async fn summary(&self, env: Option<String>) -> Result<StatusSummary> {
        self.request(|reply| Command::Summary { env, reply }).await?
    }

    /// Activity feed, newest first.
    pub async fn activity(&self) -> Result<Vec<ActivityLogEntry>> {
        self.request(|reply| Command::Activity { reply }).await
    }

    pub async fn agents(&self) -> Result<Vec<AgentInfo>> {
        self.request(|reply| Command::Agents { reply }).await
    }

    /// Wait until no deferred effect or analysis is pending.
    pub async fn settle(&self) -> Result<()> {
        self.request(|reply| Command::Settle { reply }).await
    }
}

struct Worker {
    reconciler: Reconciler,
    analyzer: Arc<dyn ManifestAnalyzer>,
    persistence: Option<StatePersistence>,
    deferred: DeferredQueue<DeferredTask>,
    continuations: mpsc::UnboundedSender<Continuation>,
    in_flight: usize,
    idle_waiters: Vec<Reply<()>>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut continuations: mpsc::UnboundedReceiver<Continuation>,
    ) {
        info!(
            environment = %self.reconciler.selected_environment().id,
            "Dashboard worker started"
        );

        loop {
            let next_due = self.deferred.next_due();

            tokio::select! {
                biased;

                _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    if self.run_due() {
                        self.persist().await;
                    }
                }
                Some(continuation) = continuations.recv() => {
                    self.handle_continuation(continuation);
                    self.persist().await;
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    // Anything already due lands before the command sees state.
                    let mut mutated = self.run_due();
                    mutated |= self.handle_command(command);
                    if mutated {
                        self.persist().await;
                    }
                }
            }

            self.notify_idle();
        }

        info!(
            dropped_deferred = self.deferred.len(),
            dropped_analyses = self.in_flight,
            "Dashboard worker stopped"
        );
        self.deferred.clear();
    }

    /// Returns whether state changed.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::SimulateEvent { draft, reply } => {
                let outcome = self.reconciler.handle_event(draft);
                let now = Instant::now();
                for task in outcome.deferred {
                    debug!(env = %task.env_id, delay_ms = task.effect.delay.as_millis() as u64, "Deferred effect scheduled");
                    self.deferred.push(now + task.effect.delay, task);
                }
                if let Some(request) = outcome.analysis {
                    self.spawn_analysis(request);
                }
                let _ = reply.send(outcome.event);
                true
            }
            Command::ManualUpdate { update, reply } => {
                let updated = self.reconciler.manual_update(update);
                let mutated = updated.is_some();
                let _ = reply.send(updated);
                mutated
            }
            Command::AddComment {
                subcategory_id,
                text,
                reply,
            } => {
                let updated = self.reconciler.add_comment(&subcategory_id, &text);
                let mutated = updated.is_some();
                let _ = reply.send(updated);
                mutated
            }
            Command::SelectEnvironment { env, reply } => {
                let _ = reply.send(self.reconciler.select_environment(&env));
                false
            }
            Command::SelectedEnvironment { reply } => {
                let _ = reply.send(self.reconciler.selected_environment().clone());
                false
            }
            Command::ExportSnapshot { env, reply } => {
                let env = self.env_or_selected(env);
                let _ = reply.send(self.reconciler.export_snapshot(&env));
                false
            }
            Command::Export { env, format, reply } => {
                let env = self.env_or_selected(env);
                let result = self.reconciler.export(&env, format);
                let mutated = result.is_ok();
                let _ = reply.send(result);
                mutated
            }
            Command::Records { env, reply } => {
                let env = self.env_or_selected(env);
                let _ = reply.send(self.reconciler.records(&env));
                false
            }
            Command::Summary { env, reply } => {
                let env = self.env_or_selected(env);
                let _ = reply.send(self.reconciler.summary(&env));
                false
            }
            Command::Activity { reply } => {
                let _ = reply.send(self.reconciler.activity());
                false
            }
            Command::Agents { reply } => {
                let _ = reply.send(self.reconciler.agents().to_vec());
                false
            }
            Command::Settle { reply } => {
                self.idle_waiters.push(reply);
                false
            }
        }
    }

    fn handle_continuation(&mut self, continuation: Continuation) {
        match continuation {
            Continuation::Analysis { request, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.reconciler
                    .apply_analysis(&request, self.analyzer.name(), result);
            }
        }
    }

    fn spawn_analysis(&mut self, request: AnalysisRequest) {
        let analyzer = self.analyzer.clone();
        let continuations = self.continuations.clone();
        self.in_flight += 1;
        debug!(file = %request.filename, analyzer = analyzer.name(), "Manifest analysis started");

        tokio::spawn(async move {
            let input = request.input.clone();
            let analysis = tokio::spawn(async move { analyzer.analyze(&input).await });
            let result = match analysis.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(file = %request.filename, error = %e, "Manifest analysis task did not finish");
                    Err(AnalyzerError::Aborted(e.to_string()))
                }
            };
            // The worker may be gone; nothing to do then.
            let _ = continuations.send(Continuation::Analysis { request, result });
        });
    }

    /// Apply every deferred task that is due. Returns whether any ran.
    fn run_due(&mut self) -> bool {
        let due = self.deferred.pop_due(Instant::now());
        let ran = !due.is_empty();
        for task in due {
            self.reconciler.apply_deferred(task);
        }
        ran
    }

    fn env_or_selected(&self, env: Option<String>) -> String {
        env.unwrap_or_else(|| self.reconciler.selected_environment().id.clone())
    }

    fn notify_idle(&mut self) {
        if self.idle_waiters.is_empty() || !self.deferred.is_empty() || self.in_flight > 0 {
            return;
        }
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    async fn persist(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        if let Err(e) = persistence.save(&self.reconciler.snapshot()).await {
            warn!(error = %e, "Failed to persist dashboard state");
        }
    }
}
