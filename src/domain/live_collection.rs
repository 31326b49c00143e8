use crate::domain::models::Identified;

/// A change observed on the push channel, already decoded for one entity family.
///
/// `Created(None)` and `Updated(None)` mean the payload did not carry a full
/// record (event metadata only).
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Created(Option<T>),
    Updated(Option<T>),
    Deleted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Inserted,
    Replaced,
    Removed,
    Unchanged,
    RefetchRequired,
}

/// Local, invalidatable copy of a server-owned collection.
#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    items: Vec<T>,
}

impl<T> Default for LiveCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> LiveCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Replaces the whole snapshot after a full refetch.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn apply(&mut self, change: Change<T>) -> Reconciliation {
        match change {
            Change::Created(Some(record)) => {
                if self.contains(record.id()) {
                    Reconciliation::Unchanged
                } else {
                    self.items.push(record);
                    Reconciliation::Inserted
                }
            }
            Change::Updated(Some(record)) => match self.position(record.id()) {
                Some(index) => {
                    self.items[index] = record;
                    Reconciliation::Replaced
                }
                None => Reconciliation::RefetchRequired,
            },
            Change::Created(None) | Change::Updated(None) => Reconciliation::RefetchRequired,
            Change::Deleted(id) => match self.position(&id) {
                Some(index) => {
                    self.items.remove(index);
                    Reconciliation::Removed
                }
                None => Reconciliation::Unchanged,
            },
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{Change, LiveCollection, Reconciliation};
    use crate::domain::models::Identified;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        label: String,
    }

    impl Identified for Row {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn row(id: &str, label: &str) -> Row {
        Row {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    fn ids(collection: &LiveCollection<Row>) -> BTreeSet<String> {
        collection.items().iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn duplicate_created_event_is_ignored() {
        let mut collection = LiveCollection::new();

        assert_eq!(
            collection.apply(Change::Created(Some(row("a", "first")))),
            Reconciliation::Inserted
        );
        assert_eq!(
            collection.apply(Change::Created(Some(row("a", "first")))),
            Reconciliation::Unchanged
        );
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn created_without_record_requests_refetch() {
        let mut collection: LiveCollection<Row> = LiveCollection::new();
        assert_eq!(
            collection.apply(Change::Created(None)),
            Reconciliation::RefetchRequired
        );
        assert!(collection.is_empty());
    }

    #[test]
    fn updated_replaces_in_place_and_keeps_order() {
        let mut collection =
            LiveCollection::from_snapshot(vec![row("a", "1"), row("b", "2"), row("c", "3")]);

        assert_eq!(
            collection.apply(Change::Updated(Some(row("b", "two")))),
            Reconciliation::Replaced
        );
        let labels: Vec<&str> = collection.items().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "two", "3"]);
    }

    #[test]
    fn updated_for_unknown_record_never_inserts() {
        let mut collection = LiveCollection::from_snapshot(vec![row("a", "1")]);
        assert_eq!(
            collection.apply(Change::Updated(Some(row("zzz", "ghost")))),
            Reconciliation::RefetchRequired
        );
        assert_eq!(collection.len(), 1);
        assert!(!collection.contains("zzz"));
    }

    #[test]
    fn deleting_absent_record_is_a_no_op() {
        let mut collection = LiveCollection::from_snapshot(vec![row("a", "1"), row("b", "2")]);
        assert_eq!(
            collection.apply(Change::Deleted("missing".to_string())),
            Reconciliation::Unchanged
        );
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn event_sequence_matches_server_side_membership() {
        let mut server: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let mut collection = LiveCollection::from_snapshot(vec![row("a", "1"), row("b", "2")]);

        let events = vec![
            Change::Created(Some(row("c", "3"))),
            Change::Deleted("a".to_string()),
            Change::Created(Some(row("c", "3"))),
            Change::Updated(Some(row("b", "22"))),
            Change::Created(Some(row("d", "4"))),
            Change::Deleted("d".to_string()),
            Change::Deleted("d".to_string()),
        ];

        for event in events {
            match &event {
                Change::Created(Some(record)) => {
                    server.insert(record.id.clone());
                }
                Change::Deleted(id) => {
                    server.remove(id);
                }
                _ => {}
            }
            collection.apply(event);
        }

        assert_eq!(ids(&collection), server);
    }
}
