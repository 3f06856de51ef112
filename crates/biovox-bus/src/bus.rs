use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use biovox_foundation::BusError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::event::{Event, EventData, EventType};

pub type Subscriber = dyn Fn(&Event) + Send + Sync;

/// Opaque handle returned by `subscribe`, needed to `unsubscribe` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type SubscriberMap = HashMap<EventType, Vec<(u64, Arc<Subscriber>)>>;

/// Thread-safe typed publish/subscribe hub. Not a process-wide singleton:
/// callers construct as many buses as they need (one per test, one per
/// process, ...) and share them via `Arc`.
pub struct EventBus {
    subscribers: Arc<Mutex<SubscriberMap>>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    running: Arc<AtomicBool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            tx,
            rx,
            running: Arc::new(AtomicBool::new(false)),
            dispatcher: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a callback to one event type. Callbacks run synchronously,
    /// in subscription order, on the dispatcher thread -- they must not
    /// block or perform long work, or they will stall delivery of every
    /// other event type.
    pub fn subscribe(
        &self,
        event_type: EventType,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, event_type: EventType, id: SubscriptionId) {
        if let Some(list) = self.subscribers.lock().get_mut(&event_type) {
            list.retain(|(sub_id, _)| *sub_id != id.0);
        }
    }

    /// Non-blocking enqueue. Never fails under normal operation; the queue
    /// is unbounded for the lifetime of the bus.
    pub fn publish(&self, data: EventData) {
        let _ = self.tx.send(Event::new(data));
    }

    pub fn start(&self) -> Result<(), BusError> {
        let mut guard = self.dispatcher.lock();
        if guard.is_some() {
            return Err(BusError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        let rx = self.rx.clone();
        let subscribers = Arc::clone(&self.subscribers);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("biovox-event-dispatcher".into())
            .spawn(move || Self::dispatch_loop(rx, subscribers, running))
            .expect("failed to spawn event dispatcher thread");

        *guard = Some(handle);
        Ok(())
    }

    /// Publishes SYSTEM_SHUTDOWN, which the dispatcher recognises as the
    /// sentinel to flush remaining events and exit.
    pub fn stop(&self) -> Result<(), BusError> {
        let handle = self.dispatcher.lock().take();
        let Some(handle) = handle else {
            return Err(BusError::NotRunning);
        };
        self.running.store(false, Ordering::SeqCst);
        self.publish(EventData::SystemShutdown);

        let deadline = Duration::from_secs(2);
        let start = std::time::Instant::now();
        while !handle.is_finished() && start.elapsed() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            warn!("event dispatcher did not stop within the shutdown deadline");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn dispatch_loop(rx: Receiver<Event>, subscribers: Arc<Mutex<SubscriberMap>>, running: Arc<AtomicBool>) {
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    let is_shutdown = matches!(event.data, EventData::SystemShutdown);
                    Self::dispatch(&subscribers, &event);
                    if is_shutdown {
                        // Flush anything already queued behind the sentinel
                        // before the dispatcher exits.
                        while let Ok(pending) = rx.try_recv() {
                            Self::dispatch(&subscribers, &pending);
                        }
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn dispatch(subscribers: &Arc<Mutex<SubscriberMap>>, event: &Event) {
        // Snapshot the subscriber list (cheap Arc clones) under the lock,
        // invoke outside it so a subscriber calling subscribe/unsubscribe
        // doesn't deadlock and so a slow subscriber doesn't hold the lock.
        let callbacks: Vec<Arc<Subscriber>> = {
            let guard = subscribers.lock();
            guard
                .get(&event.event_type())
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };

        for cb in callbacks {
            let result = catch_unwind(AssertUnwindSafe(|| cb(event)));
            if let Err(panic) = result {
                let msg = panic_message(&panic);
                error!(event = ?event.event_type(), "subscriber callback panicked: {msg}");
            }
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
