//! Debounced auto-save of the active chat.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use chrono::{DateTime, Utc};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::lock::Mutex;
use chatui_types::{Result, session::ChatSession};
use crate::chat_store::ChatStore;
use crate::ports::TimerPort;

/// A chat written by the auto-saver
#[derive(Debug, Clone, PartialEq)]
pub struct AutoSaved {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Only the most recent `schedule` call saves; every newer `schedule` or a
/// `cancel` makes older pending saves give up after their sleep.
///
/// The snapshot is taken when the save fires, and saves run one at a time.
/// A chat saved once keeps its id even if the snapshot was taken before
/// the runtime learned it.
pub struct AutoSaver {
    store: Rc<ChatStore>,
    timer: Rc<dyn TimerPort>,
    delay_ms: Cell<u32>,
    ticket: Rc<Cell<u64>>,
    writing: Rc<Mutex<()>>,
    assigned: Rc<RefCell<Option<AutoSaved>>>,
}

impl AutoSaver {
    /// `delay_ms == 0` disables auto-save
    pub fn new(store: Rc<ChatStore>, timer: Rc<dyn TimerPort>, delay_ms: u32) -> Self {
        Self {
            store,
            timer,
            delay_ms: Cell::new(delay_ms),
            ticket: Rc::new(Cell::new(0)),
            writing: Rc::new(Mutex::new(())),
            assigned: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_delay(&self, delay_ms: u32) {
        self.delay_ms.set(delay_ms);
    }

    pub fn is_enabled(&self) -> bool {
        self.delay_ms.get() > 0
    }

    /// Returns a future to spawn. `take_snapshot` runs after the delay; the
    /// future resolves to `None` when the save was superseded, disabled, or
    /// the snapshot has no messages.
    pub fn schedule<F>(&self, take_snapshot: F) -> LocalBoxFuture<'static, Option<Result<AutoSaved>>>
    where
        F: FnOnce() -> ChatSession + 'static,
    {
        let ticket = self.ticket.get() + 1;
        self.ticket.set(ticket);

        let delay = self.delay_ms.get();
        if delay == 0 {
            return futures::future::ready(None).boxed_local();
        }

        let sleep = self.timer.sleep(delay);
        let current = self.ticket.clone();
        let writing = self.writing.clone();
        let assigned = self.assigned.clone();
        let store = self.store.clone();
        async move {
            sleep.await;
            if current.get() != ticket {
                return None;
            }
            let _writing = writing.lock().await;
            if current.get() != ticket {
                return None;
            }

            let mut snapshot = take_snapshot();
            if snapshot.messages.is_empty() {
                return None;
            }
            if snapshot.id.is_none() {
                let known = assigned.borrow().clone();
                if let Some(known) = known.filter(|k| k.created_at == snapshot.created_at) {
                    snapshot.id = Some(known.id);
                }
            }

            let saved = store.save(&snapshot).await.map(|id| AutoSaved {
                id,
                created_at: snapshot.created_at,
            });
            if let Ok(saved) = &saved {
                *assigned.borrow_mut() = Some(saved.clone());
            }
            Some(saved)
        }
        .boxed_local()
    }

    /// Drop every pending save.
    pub fn cancel(&self) {
        self.ticket.set(self.ticket.get() + 1);
    }
}
