use std::collections::BTreeMap;

use super::{StoreError, TicketRepository};
use crate::model::{Category, Ticket};

/// In-process repository keyed by `(partition, id)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    docs: BTreeMap<(Category, String), Ticket>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, counting any stale relocation leftovers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Fetch the document stored under an exact key.
    #[must_use]
    pub fn get_by_key(&self, id: &str, partition_key: &Category) -> Option<&Ticket> {
        self.docs.get(&(partition_key.clone(), id.to_string()))
    }
}

impl TicketRepository for MemoryRepository {
    fn get(&self, id: &str) -> Result<Ticket, StoreError> {
        self.docs
            .iter()
            .filter(|((_, doc_id), _)| doc_id == id)
            .map(|(_, ticket)| ticket)
            .max_by_key(|ticket| ticket.version())
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn create(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        let key = (ticket.partition_key().clone(), ticket.id.clone());
        if self.docs.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                id: ticket.id.clone(),
            });
        }
        self.docs.insert(key, ticket.clone());
        Ok(())
    }

    fn put(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.docs.insert(
            (ticket.partition_key().clone(), ticket.id.clone()),
            ticket.clone(),
        );
        Ok(())
    }

    fn delete_by_key(&mut self, id: &str, partition_key: &Category) -> Result<(), StoreError> {
        self.docs
            .remove(&(partition_key.clone(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn list(&self) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self.docs.values().cloned().collect();
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::NewTicket;
    use crate::machine::TicketStateMachine;
    use crate::model::Actor;

    fn sample(id: &str) -> Ticket {
        TicketStateMachine::default()
            .open_ticket(
                id,
                &NewTicket {
                    title: "Printer".to_string(),
                    content: "Paper jam".to_string(),
                    attachment: None,
                },
                &Actor::new("bob@corp.io", ["user"]),
                "2025-03-04T09:00:00Z".parse().unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn same_id_may_live_under_two_partitions() {
        let mut repo = MemoryRepository::new();
        let ticket = sample("2025-0001");
        repo.create(&ticket).unwrap();

        let mut moved = ticket.clone();
        moved.category = Category::new("Hardware");
        repo.create(&moved).unwrap();
        assert_eq!(repo.len(), 2);

        let err = repo.create(&ticket).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[test]
    fn delete_by_key_only_touches_that_partition() {
        let mut repo = MemoryRepository::new();
        let ticket = sample("2025-0001");
        repo.create(&ticket).unwrap();
        let err = repo
            .delete_by_key("2025-0001", &Category::new("Hardware"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        repo.delete_by_key("2025-0001", &Category::other()).unwrap();
        assert!(repo.is_empty());
        assert!(matches!(
            repo.get("2025-0001"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn put_overwrites_under_the_current_partition() {
        let mut repo = MemoryRepository::new();
        let mut ticket = sample("2025-0001");
        repo.put(&ticket).unwrap();
        ticket.title = "Printer (3rd floor)".to_string();
        repo.put(&ticket).unwrap();
        assert_eq!(repo.len(), 1);
        assert_eq!(
            repo.get_by_key("2025-0001", &Category::other())
                .map(|t| t.title.as_str()),
            Some("Printer (3rd floor)")
        );
    }
}
