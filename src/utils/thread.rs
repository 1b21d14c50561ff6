use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-key exclusive sections granted strictly in arrival order.
///
/// Each key owns a ticket counter; a caller takes the next ticket and waits
/// until it is being served. Different keys never block each other.
#[derive(Default)]
pub struct KeyedFifoLock {
    slots: Mutex<HashMap<String, Arc<TicketSlot>>>,
}

#[derive(Default)]
struct TicketSlot {
    state: Mutex<Tickets>,
    turn: Condvar,
}

#[derive(Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

/// Held for the duration of the exclusive section; dropping it admits the
/// next caller for the same key.
pub struct FifoGuard {
    slot: Arc<TicketSlot>,
}

impl KeyedFifoLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, key: &str) -> FifoGuard {
        let slot = self
            .slots
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();

        let mut tickets = slot.state.lock();
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            slot.turn.wait(&mut tickets);
        }
        drop(tickets);

        FifoGuard { slot }
    }
}

impl Drop for FifoGuard {
    fn drop(&mut self) {
        self.slot.state.lock().serving += 1;
        self.slot.turn.notify_all();
    }
}
