//! Session arena.
//!
//! Sessions are indexed by conversation id and never aliased. The arena lock
//! is held only to snapshot or commit a session; the machine runs on the
//! snapshot, so slow collaborators in one conversation never block another.
//!
//! Every slot carries an epoch taken from a hub-wide counter. A commit is
//! accepted only if the slot still has the epoch the snapshot was taken at;
//! ending a session removes the slot, so results still in flight for it are
//! dropped when they return.
//!
//! Slots idle for longer than `sessions.idle_ttl_secs` are swept whenever the
//! arena is locked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::machine::{Directive, EscalationStateMachine, Event};
use crate::session::Session;
use crate::stage::Stage;

struct Slot {
    session: Session,
    epoch: u64,
    touched: Instant,
}

type Slots = HashMap<String, Slot>;

pub struct ConversationHub {
    machine: EscalationStateMachine,
    slots: Mutex<Slots>,
    next_epoch: AtomicU64,
    idle_ttl: Duration,
}

impl ConversationHub {
    pub fn new(machine: EscalationStateMachine) -> Self {
        let idle_ttl = machine.config().sessions.idle_ttl();
        Self {
            machine,
            slots: Mutex::new(HashMap::new()),
            next_epoch: AtomicU64::new(1),
            idle_ttl,
        }
    }

    /// Open a session, or attach a caller identity to an existing one.
    pub async fn open(&self, id: &str, caller: Option<String>) {
        let mut slots = self.live().await;
        match slots.get_mut(id) {
            Some(slot) => {
                if caller.is_some() {
                    slot.session.caller = caller;
                }
                slot.touched = Instant::now();
            }
            None => {
                tracing::debug!(session = id, "Session opened");
                let slot = self.fresh(Session::new(id, caller));
                slots.insert(id.to_string(), slot);
            }
        }
    }

    /// Run one event for session `id`, opening it if needed.
    ///
    /// Returns an empty list when the result was discarded because the
    /// session ended or was changed while the event was being processed.
    /// A caller attached by [`open`] mid-flight is kept.
    ///
    /// [`open`]: ConversationHub::open
    pub async fn handle(&self, id: &str, event: Event) -> Vec<Directive> {
        let ending = matches!(event, Event::EndSession);
        let (mut session, epoch) = self.snapshot(id).await;

        let directives = self.machine.handle(&mut session, event).await;

        let mut slots = self.live().await;
        if slots.get(id).map(|slot| slot.epoch) != Some(epoch) {
            tracing::warn!(session = id, "Session changed mid-flight; discarding result");
            return Vec::new();
        }
        if ending {
            slots.remove(id);
            return directives;
        }
        if let Some(slot) = slots.get_mut(id) {
            session.caller = slot.session.caller.take();
            slot.session = session;
            slot.epoch = self.bump();
            slot.touched = Instant::now();
        }
        directives
    }

    /// End session `id`. In-flight results for it are discarded.
    pub async fn end(&self, id: &str) -> bool {
        let removed = self.live().await.remove(id).is_some();
        if removed {
            tracing::debug!(session = id, "Session ended");
        }
        removed
    }

    pub async fn stage(&self, id: &str) -> Option<Stage> {
        self.live().await.get(id).map(|slot| slot.session.stage())
    }

    /// Copy of the committed session state.
    pub async fn session(&self, id: &str) -> Option<Session> {
        self.live().await.get(id).map(|slot| slot.session.clone())
    }

    pub async fn active_sessions(&self) -> usize {
        self.live().await.len()
    }

    async fn snapshot(&self, id: &str) -> (Session, u64) {
        let mut slots = self.live().await;
        let slot = slots
            .entry(id.to_string())
            .or_insert_with(|| self.fresh(Session::new(id, None)));
        slot.touched = Instant::now();
        (slot.session.clone(), slot.epoch)
    }

    /// Lock the arena and drop expired slots.
    async fn live(&self) -> MutexGuard<'_, Slots> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        let before = slots.len();
        slots.retain(|_, slot| now.duration_since(slot.touched) < self.idle_ttl);
        let expired = before - slots.len();
        if expired > 0 {
            tracing::info!(expired, remaining = slots.len(), "Idle sessions expired");
        }
        slots
    }

    fn fresh(&self, session: Session) -> Slot {
        Slot {
            session,
            epoch: self.bump(),
            touched: Instant::now(),
        }
    }

    fn bump(&self) -> u64 {
        self.next_epoch.fetch_add(1, Ordering::Relaxed)
    }
}
