//! Single-slot debounce.
//!
//! At most one computation is pending. Scheduling replaces it, and every
//! scheduled [`Ticket`] carries a generation so a timer that fires after it
//! was replaced or cancelled is recognised as stale.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Longest accepted quiet period; longer windows are clamped to it.
pub(crate) const MAX_WINDOW: Duration = Duration::from_secs(86_400);

/// Handle for one scheduled computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Generation number of this ticket.
    pub const fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: Ticket,
    deadline: Instant,
}

/// Owned pending-computation slot.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    generation: u64,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.min(MAX_WINDOW),
            generation: 0,
            pending: None,
        }
    }

    /// (Re)start the timer. Any previously pending ticket becomes stale.
    pub fn schedule(&mut self, now: Instant) -> Ticket {
        self.generation += 1;
        let ticket = Ticket(self.generation);
        let replaced = self.pending.replace(Pending {
            ticket,
            deadline: now + self.window,
        });
        trace!(
            generation = self.generation,
            replaced = replaced.is_some(),
            "Debounce scheduled"
        );
        ticket
    }

    /// Drop the pending computation. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.pending.take().is_some();
        if cancelled {
            trace!(generation = self.generation, "Debounce cancelled");
        }
        cancelled
    }

    /// Whether a computation is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending computation is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Consume the pending slot if `ticket` is the current one.
    ///
    /// Stale tickets are a no-op and return `false`.
    pub fn fire(&mut self, ticket: Ticket) -> bool {
        match self.pending {
            Some(p) if p.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => {
                trace!(stale = ticket.0, current = self.generation, "Ignoring stale debounce");
                false
            }
        }
    }

    /// Take the pending ticket if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Ticket> {
        match self.pending {
            Some(p) if p.deadline <= now => {
                self.pending = None;
                Some(p.ticket)
            }
            _ => None,
        }
    }
}
