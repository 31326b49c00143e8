use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket handed to one in-flight request of a logical query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// Drops responses that arrive after a newer response for the same query was applied.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns true and records the ticket when it is newer than the last applied one.
    pub fn accept(&self, ticket: Ticket) -> bool {
        let mut current = self.applied.load(Ordering::SeqCst);
        loop {
            if ticket.0 <= current {
                return false;
            }
            match self.applied.compare_exchange(
                current,
                ticket.0,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SequenceGuard;

    #[test]
    fn accepts_in_order_responses() {
        let guard = SequenceGuard::new();
        let first = guard.issue();
        let second = guard.issue();

        assert!(guard.accept(first));
        assert!(guard.accept(second));
    }

    #[test]
    fn discards_stale_response_arriving_late() {
        let guard = SequenceGuard::new();
        let slow = guard.issue();
        let fast = guard.issue();

        assert!(guard.accept(fast));
        assert!(!guard.accept(slow));
        assert!(!guard.accept(fast));
    }
}
