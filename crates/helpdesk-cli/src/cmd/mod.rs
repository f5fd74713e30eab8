pub mod completions;
pub mod create;
pub mod deadline;
pub mod init;
pub mod list;
pub mod show;
pub mod update;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use helpdesk_core::config::{EngineConfig, load_config_file, load_engine_config};
use helpdesk_core::machine::TicketStateMachine;
use helpdesk_core::service::TicketService;
use helpdesk_core::store::{FileRepository, StoreLock};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a command waits for another `hd` process to release the store.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by every command, resolved from global flags.
#[derive(Debug, Clone)]
pub struct Globals {
    pub project_root: PathBuf,
    pub config: Option<PathBuf>,
    pub actor: Option<String>,
    pub roles: Vec<String>,
    pub now: Option<DateTime<Utc>>,
}

impl Globals {
    /// The instant commands evaluate against.
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    pub fn load_config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(path) => load_config_file(path),
            None => load_engine_config(&self.project_root),
        }
    }

    pub fn machine(&self) -> Result<TicketStateMachine> {
        Ok(self.load_config()?.build()?)
    }

    /// Open the ticket service over the project's file store.
    pub fn service(&self) -> Result<TicketService<FileRepository>> {
        let config = self.load_config()?;
        let machine = config.build()?;
        let access = config.access_policy()?;
        let repo = FileRepository::open(&self.project_root)?;
        Ok(TicketService::new(machine, access, repo))
    }

    /// Exclusive store lock for commands that write.
    pub fn write_lock(&self) -> Result<StoreLock> {
        let path = lock_path(&self.project_root)?;
        StoreLock::exclusive(&path, LOCK_TIMEOUT)
            .with_context(|| format!("Failed to lock {}", path.display()))
    }

    /// Shared store lock for commands that only read.
    pub fn read_lock(&self) -> Result<StoreLock> {
        let path = lock_path(&self.project_root)?;
        StoreLock::shared(&path, LOCK_TIMEOUT)
            .with_context(|| format!("Failed to lock {}", path.display()))
    }
}

fn lock_path(project_root: &Path) -> Result<PathBuf> {
    Ok(FileRepository::open(project_root)?.lock_path())
}

/// Format a timestamp for human output.
pub fn human_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}
