//! Lock actor
//!
//! One task owns the [`LockController`] and drains a single queue. Collaborator
//! results, lifecycle transitions and user commands all arrive on that queue and
//! are handled one at a time, so controller state is never touched concurrently.
//! Collaborator calls run in their own tasks and post their result back; the
//! actor never waits on them.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use geogate_core::{AppLifecycle, Effect, LockController, LockEvent, LockSnapshot};

use crate::collaborators::Collaborators;
use crate::config::GateConfig;
use crate::error::{DaemonError, Result};

/// Queue message
#[derive(Debug)]
enum Message {
    Event(LockEvent),
    Shutdown,
}

/// Owner of the lock controller
pub struct LockActor {
    controller: LockController,
    collaborators: Collaborators,
    inbox: mpsc::Receiver<Message>,
    /// Weak so that dropping every handle stops the actor
    outbox: mpsc::WeakSender<Message>,
    snapshots: watch::Sender<LockSnapshot>,
}

impl LockActor {
    /// Start an actor on the current runtime and return its handle
    ///
    /// The lifecycle signal is subscribed before the actor task starts, so no
    /// transition emitted after this call is missed.
    pub fn spawn(config: &GateConfig, collaborators: Collaborators) -> LockHandle {
        let (tx, inbox) = mpsc::channel(config.queue_capacity.max(1));
        let controller = LockController::new(config.policy.clone());
        let (snapshots, snapshot_rx) = watch::channel(controller.snapshot());
        let lifecycle_rx = collaborators.lifecycle.subscribe();

        let actor = LockActor {
            controller,
            collaborators,
            inbox,
            outbox: tx.downgrade(),
            snapshots,
        };
        let task = tokio::spawn(actor.run(lifecycle_rx));

        LockHandle {
            tx,
            snapshots: snapshot_rx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(mut self, lifecycle_rx: mpsc::UnboundedReceiver<AppLifecycle>) {
        info!("Lock actor started");
        let forwarder = tokio::spawn(forward_lifecycle(lifecycle_rx, self.outbox.clone()));

        let effects = self.controller.start();
        self.execute(effects);
        self.publish();

        while let Some(message) = self.inbox.recv().await {
            match message {
                Message::Event(event) => {
                    let effects = self.controller.handle(event);
                    self.execute(effects);
                    self.publish();
                }
                Message::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        // Unsubscribe from lifecycle transitions
        forwarder.abort();
        let _ = forwarder.await;
        info!("Lock actor stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }

    fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CheckAvailability => {
                    let biometrics = Arc::clone(&self.collaborators.biometrics);
                    self.dispatch(async move {
                        LockEvent::SensorAvailability(biometrics.check_availability().await)
                    });
                }
                Effect::RequestPosition(options) => {
                    let position = Arc::clone(&self.collaborators.position);
                    self.dispatch(async move {
                        LockEvent::PositionResult(position.get_fix(options).await)
                    });
                }
                Effect::RequestPermission {
                    request,
                    permission,
                } => {
                    let permissions = Arc::clone(&self.collaborators.permissions);
                    self.dispatch(async move {
                        let response = permissions.request(&permission).await;
                        LockEvent::PermissionResult { request, response }
                    });
                }
                Effect::IssueChallenge { challenge, prompt } => {
                    let biometrics = Arc::clone(&self.collaborators.biometrics);
                    self.dispatch(async move {
                        let result = biometrics.challenge(&prompt).await;
                        LockEvent::ChallengeResult { challenge, result }
                    });
                }
                Effect::Confirm { challenge, message } => {
                    info!("Confirming {}", challenge);
                    self.collaborators.notifier.confirm(&message);
                }
            }
        }
    }

    /// Run a collaborator call in its own task and queue its result
    fn dispatch<F>(&self, request: F)
    where
        F: Future<Output = LockEvent> + Send + 'static,
    {
        let outbox = self.outbox.clone();
        tokio::spawn(async move {
            let event = request.await;
            let name = event.name();
            let delivered = match outbox.upgrade() {
                Some(tx) => tx.send(Message::Event(event)).await.is_ok(),
                None => false,
            };
            if !delivered {
                debug!("Actor gone, dropping late {}", name);
            }
        });
    }
}

/// Move lifecycle transitions onto the actor queue, one at a time and in order
///
/// Waits for queue capacity rather than dropping a transition.
async fn forward_lifecycle(
    mut lifecycle_rx: mpsc::UnboundedReceiver<AppLifecycle>,
    outbox: mpsc::WeakSender<Message>,
) {
    while let Some(state) = lifecycle_rx.recv().await {
        let Some(tx) = outbox.upgrade() else { break };
        if tx.send(Message::Event(LockEvent::Lifecycle(state))).await.is_err() {
            break;
        }
    }
    debug!("Lifecycle forwarding stopped");
}

/// Cloneable handle to a running lock actor
#[derive(Clone)]
pub struct LockHandle {
    tx: mpsc::Sender<Message>,
    snapshots: watch::Receiver<LockSnapshot>,
    /// Actor task, taken by the first `shutdown`
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LockHandle {
    /// The user tapped the unlock control
    pub async fn request_unlock(&self) -> Result<()> {
        self.send(LockEvent::UnlockRequested).await
    }

    /// Ask for a biometric challenge; dropped if one is pending
    pub async fn start_challenge(&self) -> Result<()> {
        self.send(LockEvent::StartChallenge).await
    }

    /// Inject a lifecycle transition directly
    pub async fn lifecycle(&self, state: AppLifecycle) -> Result<()> {
        self.send(LockEvent::Lifecycle(state)).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> LockSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch every published state
    pub fn subscribe(&self) -> watch::Receiver<LockSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published state satisfies `predicate`
    pub async fn wait_for<F>(&self, predicate: F) -> Result<LockSnapshot>
    where
        F: FnMut(&LockSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| DaemonError::ActorStopped)?
            .clone();
        Ok(snapshot)
    }

    /// Stop the actor and wait for its task to finish
    ///
    /// Outstanding collaborator calls are left running; their results are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        self.tx
            .send(Message::Shutdown)
            .await
            .map_err(|_| DaemonError::ActorStopped)?;

        if let Some(task) = task.take() {
            task.await.map_err(|_| DaemonError::ActorStopped)?;
        }
        Ok(())
    }

    async fn send(&self, event: LockEvent) -> Result<()> {
        self.tx
            .send(Message::Event(event))
            .await
            .map_err(|_| DaemonError::ActorStopped)
    }
}
