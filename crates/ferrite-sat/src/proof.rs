//! The proof sink interface.
//!
//! The core records every clause addition and deletion through this
//! abstract append-only interface; what the events become downstream
//! (DRAT, FRAT, a database, nothing) is not the core's concern. Ids are
//! assigned by the solver from one monotone 64-bit counter shared by
//! units, binaries, and long clauses.
//!
//! The sink is handed by reference into every pass that can add or
//! delete clauses; it is never reachable globally.

use crate::literal::Literal;

/// Append-only consumer of clause derivation events.
pub trait ProofSink {
    /// A clause with the given id became part of the formula.
    fn emit_add(&mut self, id: u64, lits: &[Literal]);
    /// The clause with the given id was deleted.
    fn emit_delete(&mut self, id: u64, lits: &[Literal]);
    /// The clause concludes the proof (the empty clause on UNSAT).
    fn emit_finalize(&mut self, id: u64, lits: &[Literal]);
    /// Push any buffered events downstream.
    fn flush(&mut self);
    /// Whether events are observed at all. Passes consult this to stay
    /// conservative about optimizations that are awkward to justify in a
    /// proof; [`NullSink`] returns false.
    fn is_recording(&self) -> bool {
        true
    }
}

/// Discards everything; the default sink.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProofSink for NullSink {
    fn emit_add(&mut self, _id: u64, _lits: &[Literal]) {}
    fn emit_delete(&mut self, _id: u64, _lits: &[Literal]) {}
    fn emit_finalize(&mut self, _id: u64, _lits: &[Literal]) {}
    fn flush(&mut self) {}
    fn is_recording(&self) -> bool {
        false
    }
}

/// One recorded derivation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofEvent {
    /// Clause added.
    Add {
        /// Monotone clause id.
        id: u64,
        /// Clause body.
        lits: Vec<Literal>,
    },
    /// Clause deleted.
    Delete {
        /// Monotone clause id.
        id: u64,
        /// Clause body at deletion time.
        lits: Vec<Literal>,
    },
    /// Proof-concluding clause.
    Finalize {
        /// Monotone clause id.
        id: u64,
        /// Clause body (empty on UNSAT).
        lits: Vec<Literal>,
    },
}

/// In-memory sink that buffers events in chunks, used by tests and by
/// callers that post-process the record themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    pending: Vec<ProofEvent>,
    events: Vec<ProofEvent>,
}

/// Buffered events before an automatic flush.
const CHUNK: usize = 1024;

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// All flushed events in emission order.
    pub fn events(&self) -> &[ProofEvent] {
        &self.events
    }

    /// Number of empty-clause additions (add or finalize) recorded.
    pub fn empty_clause_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| match e {
                ProofEvent::Add { lits, .. } | ProofEvent::Finalize { lits, .. } => lits.is_empty(),
                ProofEvent::Delete { .. } => false,
            })
            .count()
    }

    fn push(&mut self, event: ProofEvent) {
        self.pending.push(event);
        if self.pending.len() >= CHUNK {
            self.flush();
        }
    }
}

impl ProofSink for MemorySink {
    fn emit_add(&mut self, id: u64, lits: &[Literal]) {
        self.push(ProofEvent::Add {
            id,
            lits: lits.to_vec(),
        });
    }

    fn emit_delete(&mut self, id: u64, lits: &[Literal]) {
        self.push(ProofEvent::Delete {
            id,
            lits: lits.to_vec(),
        });
    }

    fn emit_finalize(&mut self, id: u64, lits: &[Literal]) {
        self.push(ProofEvent::Finalize {
            id,
            lits: lits.to_vec(),
        });
    }

    fn flush(&mut self) {
        self.events.append(&mut self.pending);
    }
}

/// A shared handle counts as a sink, so a caller can keep one end while
/// the solver owns the other.
impl ProofSink for std::rc::Rc<std::cell::RefCell<MemorySink>> {
    fn emit_add(&mut self, id: u64, lits: &[Literal]) {
        self.borrow_mut().emit_add(id, lits);
    }

    fn emit_delete(&mut self, id: u64, lits: &[Literal]) {
        self.borrow_mut().emit_delete(id, lits);
    }

    fn emit_finalize(&mut self, id: u64, lits: &[Literal]) {
        self.borrow_mut().emit_finalize(id, lits);
    }

    fn flush(&mut self) {
        self.borrow_mut().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Variable;

    #[test]
    fn events_surface_after_flush() {
        let mut sink = MemorySink::new();
        let lits = vec![Variable(0).positive(), Variable(1).negative()];
        sink.emit_add(1, &lits);
        sink.emit_delete(1, &lits);
        assert!(sink.events().is_empty());

        sink.flush();
        assert_eq!(sink.events().len(), 2);
        assert_eq!(
            sink.events()[0],
            ProofEvent::Add { id: 1, lits: lits.clone() }
        );
    }

    #[test]
    fn empty_clause_count_sees_add_and_finalize() {
        let mut sink = MemorySink::new();
        sink.emit_add(3, &[]);
        sink.emit_finalize(3, &[]);
        sink.emit_add(4, &[Variable(0).positive()]);
        sink.flush();
        assert_eq!(sink.empty_clause_count(), 2);
    }

    #[test]
    fn ids_are_monotone_in_practice() {
        // The sink itself does not enforce monotonicity; this documents
        // the expectation on the producer side.
        let mut sink = MemorySink::new();
        for id in 1..=5u64 {
            sink.emit_add(id, &[Variable(0).positive()]);
        }
        sink.flush();
        let ids: Vec<u64> = sink
            .events()
            .iter()
            .map(|e| match e {
                ProofEvent::Add { id, .. }
                | ProofEvent::Delete { id, .. }
                | ProofEvent::Finalize { id, .. } => *id,
            })
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
