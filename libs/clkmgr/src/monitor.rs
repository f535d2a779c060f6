use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use clkmgr_api::{MonitorLevel, MonitorToken, ResourceMonitor};

struct Subscriber {
    token: MonitorToken,
    level: MonitorLevel,
    monitor: Arc<dyn ResourceMonitor>,
}

/// Registered arbiter monitors, kept in registration order.
///
/// The list has its own lock so clients can register while a domain transition is in
/// flight; a transition works from a snapshot taken when it starts.
pub(crate) struct MonitorList {
    subscribers: Mutex<Vec<Subscriber>>,
    next_token: AtomicU32,
}

impl MonitorList {
    pub fn new() -> Self { MonitorList { subscribers: Mutex::new(Vec::new()), next_token: AtomicU32::new(0) } }

    pub fn register(&self, monitor: Arc<dyn ResourceMonitor>) -> MonitorToken {
        let token = MonitorToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let level = monitor.level();
        log::trace!("monitor {:?} registered at {:?}", token, level);
        self.lock().push(Subscriber { token, level, monitor });
        token
    }

    /// Returns false if the token was not registered.
    pub fn unregister(&self, token: MonitorToken) -> bool {
        let mut subscribers = self.lock();
        match subscribers.iter().position(|s| s.token == token) {
            Some(i) => {
                subscribers.remove(i);
                true
            }
            None => false,
        }
    }

    /// Monitors in calling order: one stage per level from `Early` to `Late`, and
    /// registration order within a stage.
    pub fn snapshot(&self) -> Vec<Arc<dyn ResourceMonitor>> {
        let subscribers = self.lock();
        let mut ordered = Vec::with_capacity(subscribers.len());
        let mut stage = MonitorLevel::Early;
        loop {
            for sub in subscribers.iter() {
                if sub.level == stage {
                    ordered.push(sub.monitor.clone());
                }
            }
            if stage == MonitorLevel::Late {
                break;
            }
            stage = stage.next();
        }
        ordered
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.lock().len() }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|_| panic!("monitor list lock poisoned"))
    }
}
