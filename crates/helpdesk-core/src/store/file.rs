use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{StoreError, TicketRepository};
use crate::model::{Category, Ticket};

/// Name of the store directory under a project root.
pub const STORE_DIR: &str = ".helpdesk";
const TICKETS_FILE: &str = "tickets.json";
const LOCK_FILE: &str = "lock";

/// JSON document store at `<root>/.helpdesk/tickets.json`.
///
/// Every call reads or rewrites the whole file. Writes go through a temp
/// file and a rename so a crash never leaves a half-written document. The
/// repository does no locking of its own; callers hold a
/// [`StoreLock`](super::StoreLock) on [`FileRepository::lock_path`].
#[derive(Debug, Clone)]
pub struct FileRepository {
    dir: PathBuf,
}

impl FileRepository {
    /// Open an initialized store under `root`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotInitialized`] if `root/.helpdesk/tickets.json` is
    /// missing.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let repo = Self {
            dir: root.join(STORE_DIR),
        };
        if !repo.tickets_path().is_file() {
            return Err(StoreError::NotInitialized(repo.dir));
        }
        Ok(repo)
    }

    /// Create the store directory and an empty ticket file if missing.
    ///
    /// Returns `true` when a new ticket file was written.
    ///
    /// # Errors
    ///
    /// Filesystem failures.
    pub fn init(root: &Path) -> Result<(Self, bool), StoreError> {
        let repo = Self {
            dir: root.join(STORE_DIR),
        };
        fs::create_dir_all(&repo.dir)?;
        let created = !repo.tickets_path().exists();
        if created {
            repo.save(&[])?;
        }
        Ok((repo, created))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn tickets_path(&self) -> PathBuf {
        self.dir.join(TICKETS_FILE)
    }

    fn load(&self) -> Result<Vec<Ticket>, StoreError> {
        let raw = fs::read_to_string(self.tickets_path())?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, tickets: &[Ticket]) -> Result<(), StoreError> {
        let tmp = self.dir.join(format!("{TICKETS_FILE}.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, tickets)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.tickets_path())?;
        Ok(())
    }
}

fn same_key(ticket: &Ticket, id: &str, partition_key: &Category) -> bool {
    ticket.id == id && ticket.partition_key() == partition_key
}

impl TicketRepository for FileRepository {
    fn get(&self, id: &str) -> Result<Ticket, StoreError> {
        self.load()?
            .into_iter()
            .filter(|t| t.id == id)
            .max_by_key(Ticket::version)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn create(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut tickets = self.load()?;
        if tickets
            .iter()
            .any(|t| same_key(t, &ticket.id, ticket.partition_key()))
        {
            return Err(StoreError::AlreadyExists {
                id: ticket.id.clone(),
            });
        }
        tickets.push(ticket.clone());
        self.save(&tickets)
    }

    fn put(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut tickets = self.load()?;
        match tickets
            .iter_mut()
            .find(|t| same_key(t, &ticket.id, ticket.partition_key()))
        {
            Some(slot) => *slot = ticket.clone(),
            None => tickets.push(ticket.clone()),
        }
        self.save(&tickets)
    }

    fn delete_by_key(&mut self, id: &str, partition_key: &Category) -> Result<(), StoreError> {
        let mut tickets = self.load()?;
        let before = tickets.len();
        tickets.retain(|t| !same_key(t, id, partition_key));
        if tickets.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        self.save(&tickets)
    }

    fn list(&self) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets = self.load()?;
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tickets)
    }
}
