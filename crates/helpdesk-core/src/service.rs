//! Caller-side orchestration: access check, load, apply, persist.
//!
//! The state machine is pure; this layer owns the read-apply-write
//! sequence around it. Lost updates between concurrent writers are only
//! prevented when the caller passes an expected version or holds a store
//! lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::intake::{IntakeError, NewTicket};
use crate::machine::{Relocation, TicketStateMachine, TransitionError};
use crate::model::{Actor, Category, ChangeSet, Comment, Ticket};
use crate::store::{PersistPlan, StoreError, TicketRepository};

/// Role an actor must hold to update tickets unless configured otherwise.
pub const DEFAULT_AGENT_ROLE: &str = "sd";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub agent_role: String,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            agent_role: DEFAULT_AGENT_ROLE.to_string(),
        }
    }
}

/// Body of an update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub ticket_id: String,
    pub changes: ChangeSet,
}

/// What an update did, for callers that report back to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub ticket: Ticket,
    pub emitted: Vec<Comment>,
    pub relocation: Option<Relocation>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{actor} lacks the `{role}` role required to update tickets")]
    Unauthorized { actor: String, role: String },
    #[error("ticket {id} not found")]
    NotFound { id: String },
    #[error("ticket {id} is at version {actual}, expected {expected}")]
    Conflict {
        id: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(StoreError),
    #[error("ticket {id} was created under its new category but the copy under {stale_key} could not be removed: {source}")]
    RelocationIncomplete {
        id: String,
        stale_key: Category,
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id },
            other => Self::Store(other),
        }
    }
}

impl ServiceError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::NotFound { .. } => ErrorCode::TicketNotFound,
            Self::Conflict { .. } => ErrorCode::VersionConflict,
            Self::Intake(err) => err.code(),
            Self::Transition(err) => err.code(),
            Self::Store(err) => err.code(),
            Self::RelocationIncomplete { .. } => ErrorCode::RelocationIncomplete,
        }
    }
}

/// Ticket operations over a repository.
#[derive(Debug)]
pub struct TicketService<R> {
    machine: TicketStateMachine,
    access: AccessPolicy,
    repo: R,
}

impl<R: TicketRepository> TicketService<R> {
    #[must_use]
    pub const fn new(machine: TicketStateMachine, access: AccessPolicy, repo: R) -> Self {
        Self {
            machine,
            access,
            repo,
        }
    }

    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Open a new ticket reported by `reporter` and store it.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Intake`] for a malformed request,
    /// [`ServiceError::Store`] if `id` is already taken or the write fails.
    pub fn create(
        &mut self,
        id: &str,
        request: &NewTicket,
        reporter: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Ticket, ServiceError> {
        let ticket = self.machine.open_ticket(id, request, reporter, now)?;
        match self.repo.get(id) {
            Ok(_) => {
                return Err(ServiceError::Store(StoreError::AlreadyExists {
                    id: id.to_string(),
                }));
            }
            Err(StoreError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        self.repo.create(&ticket)?;
        tracing::info!(ticket = %ticket.id, reporter = %reporter.email, "ticket created");
        Ok(ticket)
    }

    /// # Errors
    ///
    /// [`ServiceError::NotFound`] when no ticket has `id`.
    pub fn get(&self, id: &str) -> Result<Ticket, ServiceError> {
        Ok(self.repo.get(id)?)
    }

    /// # Errors
    ///
    /// Store failures.
    pub fn list(&self) -> Result<Vec<Ticket>, ServiceError> {
        Ok(self.repo.list()?)
    }

    /// Apply an update request and persist the result.
    ///
    /// When `expected_version` is given the update is refused if the stored
    /// ticket's [`Ticket::version`] differs. A no-op change set is not
    /// written back.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthorized`] without the agent role
    /// - [`ServiceError::NotFound`] for an unknown ticket id
    /// - [`ServiceError::Conflict`] on a version mismatch
    /// - [`ServiceError::Transition`] when the state machine refuses
    /// - [`ServiceError::RelocationIncomplete`] when a category move created
    ///   the new document but could not delete the old one
    pub fn update(
        &mut self,
        request: &UpdateRequest,
        actor: &Actor,
        now: DateTime<Utc>,
        expected_version: Option<usize>,
    ) -> Result<UpdateOutcome, ServiceError> {
        if !actor.has_role(&self.access.agent_role) {
            return Err(ServiceError::Unauthorized {
                actor: actor.email.clone(),
                role: self.access.agent_role.clone(),
            });
        }

        let current = self.repo.get(&request.ticket_id)?;
        tracing::debug!(ticket = %current.id, version = current.version(), "loaded ticket");

        if let Some(expected) = expected_version {
            let actual = current.version();
            if expected != actual {
                return Err(ServiceError::Conflict {
                    id: current.id,
                    expected,
                    actual,
                });
            }
        }

        let transition = self.machine.apply(&current, &request.changes, actor, now)?;
        if transition.is_noop() {
            tracing::debug!(ticket = %current.id, "change set had no effect; nothing written");
            return Ok(UpdateOutcome {
                ticket: transition.ticket,
                emitted: transition.emitted,
                relocation: None,
            });
        }

        let emitted = transition.emitted.clone();
        let relocation = transition.relocation.clone();
        let ticket = self.persist(PersistPlan::for_transition(transition))?;

        tracing::info!(
            ticket = %ticket.id,
            status = %ticket.status,
            comments = emitted.len(),
            "ticket updated"
        );
        Ok(UpdateOutcome {
            ticket,
            emitted,
            relocation,
        })
    }

    fn persist(&mut self, plan: PersistPlan) -> Result<Ticket, ServiceError> {
        match plan {
            PersistPlan::Upsert(ticket) => {
                self.repo.put(&ticket)?;
                Ok(ticket)
            }
            PersistPlan::Relocate { ticket, stale_key } => {
                self.repo.create(&ticket)?;
                if let Err(source) = self.repo.delete_by_key(&ticket.id, &stale_key) {
                    tracing::warn!(
                        ticket = %ticket.id,
                        %stale_key,
                        error = %source,
                        "relocated ticket but failed to delete the old document"
                    );
                    return Err(ServiceError::RelocationIncomplete {
                        id: ticket.id,
                        stale_key,
                        source,
                    });
                }
                tracing::debug!(
                    ticket = %ticket.id,
                    from = %stale_key,
                    to = %ticket.category,
                    "relocated ticket"
                );
                Ok(ticket)
            }
        }
    }
}
