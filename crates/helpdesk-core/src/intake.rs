//! New-ticket intake: request validation and the initial snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::machine::TicketStateMachine;
use crate::model::{
    Actor, Assignment, Attachment, Category, ReportingUser, Status, Ticket, TicketDates,
};

/// Body of a ticket creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("ticket {0} must not be blank")]
    MissingField(&'static str),
}

impl IntakeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidRequest
    }
}

impl TicketStateMachine {
    /// Build the initial snapshot for a new ticket.
    ///
    /// New tickets start `Unread` in category `Other`, routed to that
    /// category's group, with a deadline counted from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] if the id, title or content is
    /// blank.
    pub fn open_ticket(
        &self,
        id: &str,
        request: &NewTicket,
        reporter: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Ticket, IntakeError> {
        if id.trim().is_empty() {
            return Err(IntakeError::MissingField("id"));
        }
        if request.title.trim().is_empty() {
            return Err(IntakeError::MissingField("title"));
        }
        if request.content.trim().is_empty() {
            return Err(IntakeError::MissingField("content"));
        }

        let category = Category::other();
        let ticket = Ticket {
            id: id.to_string(),
            title: request.title.clone(),
            content: request.content.clone(),
            status: Status::Unread,
            reporting_user: ReportingUser {
                email: reporter.email.clone(),
                name: reporter.email.clone(),
            },
            assigned_to: Assignment {
                person: None,
                group: self.router().group_for(&category).clone(),
            },
            dates: TicketDates {
                created_at: now,
                closed_at: None,
                guaranteed_resolution_at: self.sla().deadline(now, &category),
            },
            attachments: request.attachment.iter().cloned().collect(),
            comments: Vec::new(),
            category,
        };

        tracing::debug!(
            ticket = %ticket.id,
            due = %ticket.dates.guaranteed_resolution_at,
            "opened ticket"
        );
        Ok(ticket)
    }
}
