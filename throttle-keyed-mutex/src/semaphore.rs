//! The bounded, optionally-fair capacity gate backing [`crate::KeyedMutex`].
//!
//! Hand-written on `parking_lot::{Mutex, Condvar}` — the same monitor shape
//! `throttle::engine`'s admission loop sleeps on — rather than pulled from
//! `tokio::sync::Semaphore`, since this collaborator is synchronous like the
//! rest of the crate.

use parking_lot::{Condvar, Mutex};

use crate::error::KeyedMutexError;

struct State {
    available: usize,
    /// Ticket handed to the next caller in fair mode.
    next_ticket: u64,
    /// Ticket currently allowed to take a permit in fair mode.
    next_to_serve: u64,
}

pub(crate) struct Semaphore {
    state: Mutex<State>,
    condvar: Condvar,
    fair: bool,
}

impl Semaphore {
    pub fn new(capacity: usize, fair: bool) -> Self {
        Self {
            state: Mutex::new(State {
                available: capacity,
                next_ticket: 0,
                next_to_serve: 0,
            }),
            condvar: Condvar::new(),
            fair,
        }
    }

    /// Block until a permit is available.
    pub fn acquire(&self) {
        let mut state = self.state.lock();
        let my_ticket = self.fair.then(|| {
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            ticket
        });

        loop {
            let my_turn = my_ticket.map_or(true, |t| t == state.next_to_serve);
            if my_turn && state.available > 0 {
                state.available -= 1;
                if let Some(t) = my_ticket {
                    state.next_to_serve = t + 1;
                }
                return;
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Take a permit only if one is immediately available — and, in fair
    /// mode, only if no other caller is already queued ahead.
    pub fn try_acquire(&self) -> Result<(), KeyedMutexError> {
        let mut state = self.state.lock();
        let queue_is_empty = state.next_ticket == state.next_to_serve;
        if state.available > 0 && (!self.fair || queue_is_empty) {
            state.available -= 1;
            if self.fair {
                state.next_ticket += 1;
                state.next_to_serve += 1;
            }
            Ok(())
        } else {
            Err(KeyedMutexError::CapacityExceeded)
        }
    }

    pub fn release(&self) {
        {
            let mut state = self.state.lock();
            state.available += 1;
        }
        self.condvar.notify_all();
    }
}
