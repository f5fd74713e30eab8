//! Ticket state machine.
//!
//! [`TicketStateMachine::apply`] turns a ticket snapshot plus a caller's
//! [`ChangeSet`] into a new snapshot and the audit comments that record each
//! side effect. The input snapshot is never touched; on error nothing is
//! produced.
//!
//! # Status rules
//!
//! `Unread` and `Open` are open; `Resolved` and `Rejected` are closed.
//!
//! - open → any other open/closed status (never back to `Unread`)
//! - closed → `Open` (reopen) only; nothing else may change on a closed ticket
//!
//! # Effect order
//!
//! Within one call effects are evaluated as status → assignment → category →
//! user comment, so the audit trail reads the same way for the same input.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorCode;
use crate::model::{Actor, Category, ChangeSet, Comment, Status, SupportGroup, Ticket};
use crate::routing::CategoryRouter;
use crate::sla::SlaPolicy;

/// Error returned by [`TicketStateMachine::apply`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("forbidden transition on ticket {id} ({from} -> {}): {reason}", .to.map_or("-", Status::as_str))]
    ForbiddenTransition {
        id: String,
        from: Status,
        to: Option<Status>,
        reason: &'static str,
    },
    #[error("invalid change set: {0}")]
    InvalidChangeSet(String),
}

impl TransitionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ForbiddenTransition { .. } => ErrorCode::ForbiddenTransition,
            Self::InvalidChangeSet(_) => ErrorCode::InvalidChangeSet,
        }
    }
}

/// The old and new partition of a ticket whose category changed.
///
/// Storage must create the document under `to` and delete it under `from`;
/// an in-place update would leave it in the wrong partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub from: Category,
    pub to: Category,
}

/// Successful result of applying a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The new snapshot, with `emitted` already appended to its comments.
    pub ticket: Ticket,
    /// Comments appended by this call, in order.
    pub emitted: Vec<Comment>,
    pub relocation: Option<Relocation>,
}

impl Transition {
    #[must_use]
    pub const fn partition_key_changed(&self) -> bool {
        self.relocation.is_some()
    }

    /// True when the call produced no observable change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.emitted.is_empty()
    }
}

/// Accumulates the comments one `apply` call emits.
struct AuditTrail<'a> {
    actor: &'a Actor,
    at: DateTime<Utc>,
    entries: Vec<Comment>,
}

impl<'a> AuditTrail<'a> {
    const fn new(actor: &'a Actor, at: DateTime<Utc>) -> Self {
        Self {
            actor,
            at,
            entries: Vec::new(),
        }
    }

    fn system(&mut self, text: impl Into<String>) {
        self.entries.push(Comment::system(self.actor, text, self.at));
    }

    fn user(&mut self, comment: Comment) {
        self.entries.push(comment);
    }
}

/// Applies change sets to tickets using injected SLA and routing policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketStateMachine {
    sla: SlaPolicy,
    router: CategoryRouter,
}

impl TicketStateMachine {
    #[must_use]
    pub const fn new(sla: SlaPolicy, router: CategoryRouter) -> Self {
        Self { sla, router }
    }

    #[must_use]
    pub const fn sla(&self) -> &SlaPolicy {
        &self.sla
    }

    #[must_use]
    pub const fn router(&self) -> &CategoryRouter {
        &self.router
    }

    /// Apply `changes` to `ticket` on behalf of `actor` at instant `now`.
    ///
    /// # Errors
    ///
    /// - [`TransitionError::InvalidChangeSet`] when no field is present or a
    ///   present field is blank or inconsistent.
    /// - [`TransitionError::ForbiddenTransition`] when a closed ticket is
    ///   changed without being reopened, or an open ticket is sent back to
    ///   `Unread`.
    pub fn apply(
        &self,
        ticket: &Ticket,
        changes: &ChangeSet,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionError> {
        validate(changes)?;

        let mut next = ticket.clone();
        let mut audit = AuditTrail::new(actor, now);

        if ticket.status.is_closed() {
            reopen(&mut next, changes, &mut audit)?;
        } else {
            self.apply_open(&mut next, changes, &mut audit)?;
        }

        let relocation = (next.category != ticket.category).then(|| Relocation {
            from: ticket.category.clone(),
            to: next.category.clone(),
        });

        next.comments.extend(audit.entries.iter().cloned());

        tracing::debug!(
            ticket = %next.id,
            actor = %actor.email,
            emitted = audit.entries.len(),
            relocated = relocation.is_some(),
            "applied change set"
        );

        Ok(Transition {
            ticket: next,
            emitted: audit.entries,
            relocation,
        })
    }

    fn apply_open(
        &self,
        next: &mut Ticket,
        changes: &ChangeSet,
        audit: &mut AuditTrail<'_>,
    ) -> Result<(), TransitionError> {
        let closing_now = changes
            .status
            .is_some_and(|s| s != next.status && s.is_closed());
        if changes.closing_comment.is_some() && !closing_now {
            return Err(TransitionError::InvalidChangeSet(
                "closingComment requires a transition to Resolved or Rejected".to_string(),
            ));
        }

        if let Some(target) = changes.status.filter(|s| *s != next.status) {
            if target == Status::Unread {
                return Err(TransitionError::ForbiddenTransition {
                    id: next.id.clone(),
                    from: next.status,
                    to: Some(target),
                    reason: "a ticket cannot return to Unread",
                });
            }
            audit.system(format!("status changed from {} to {}", next.status, target));
            next.status = target;
            if target.is_closed() {
                next.dates.closed_at = Some(audit.at);
                if let Some(text) = &changes.closing_comment {
                    audit.system(text.clone());
                }
            }
        }

        if let Some(person) = changes.person() {
            if next.assigned_to.person.as_deref() != Some(person) {
                audit.system(format!("assigned to {person}"));
                next.assigned_to.person = Some(person.to_string());
            }
        }

        if let Some(category) = changes.category.as_ref().filter(|c| **c != next.category) {
            audit.system(format!(
                "category changed from {} to {}",
                next.category, category
            ));
            next.category = category.clone();
            let group = self.router.group_for(category);
            if *group != next.assigned_to.group {
                change_group(next, group.clone(), audit);
            }
        }

        if let Some(comment) = &changes.new_comment {
            let entry = Comment::user(
                audit.actor,
                comment.text.clone(),
                comment.attachment.clone(),
                audit.at,
            );
            audit.user(entry);
        }

        Ok(())
    }
}

fn change_group(next: &mut Ticket, group: SupportGroup, audit: &mut AuditTrail<'_>) {
    audit.system(format!("group changed to {group}"));
    next.assigned_to.group = group;
    if next.assigned_to.person.take().is_some() {
        audit.system("person assignment removed due to group change");
    }
}

fn reopen(
    next: &mut Ticket,
    changes: &ChangeSet,
    audit: &mut AuditTrail<'_>,
) -> Result<(), TransitionError> {
    match changes.status {
        Some(Status::Open) => {}
        other => {
            return Err(TransitionError::ForbiddenTransition {
                id: next.id.clone(),
                from: next.status,
                to: other,
                reason: "a closed ticket must be reopened before it can be modified",
            });
        }
    }

    let ignored = changes.non_status_fields();
    if !ignored.is_empty() {
        tracing::warn!(
            ticket = %next.id,
            ?ignored,
            "reopen applies status only; other fields were not applied"
        );
    }

    audit.system(format!("status changed from {} to {}", next.status, Status::Open));
    next.status = Status::Open;
    next.dates.closed_at = None;
    Ok(())
}

fn validate(changes: &ChangeSet) -> Result<(), TransitionError> {
    fn blank(field: &str) -> TransitionError {
        TransitionError::InvalidChangeSet(format!("{field} must not be blank"))
    }

    if changes.is_empty() {
        return Err(TransitionError::InvalidChangeSet(
            "no recognized field present".to_string(),
        ));
    }
    if changes.person().is_some_and(|p| p.trim().is_empty()) {
        return Err(blank("assignedTo.person"));
    }
    if changes
        .category
        .as_ref()
        .is_some_and(|c| c.as_str().trim().is_empty())
    {
        return Err(blank("category"));
    }
    if changes
        .new_comment
        .as_ref()
        .is_some_and(|c| c.text.trim().is_empty())
    {
        return Err(blank("newComment.text"));
    }
    if changes
        .closing_comment
        .as_ref()
        .is_some_and(|c| c.trim().is_empty())
    {
        return Err(blank("closingComment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assignment, Attachment, ReportingUser, TicketDates};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn agent() -> Actor {
        Actor::new("ann@helpdesk.io", ["sd"])
    }

    fn ticket(status: Status, category: &str, person: Option<&str>) -> Ticket {
        let router = CategoryRouter::default();
        let category = Category::new(category);
        Ticket {
            id: "2025-0042".to_string(),
            title: "VPN drops".to_string(),
            content: "Every 10 minutes".to_string(),
            assigned_to: Assignment {
                person: person.map(str::to_string),
                group: router.group_for(&category).clone(),
            },
            category,
            status,
            reporting_user: ReportingUser {
                email: "bob@corp.io".to_string(),
                name: "bob@corp.io".to_string(),
            },
            dates: TicketDates {
                created_at: at("2025-03-03T09:00:00Z"),
                closed_at: status.is_closed().then(|| at("2025-03-04T09:00:00Z")),
                guaranteed_resolution_at: at("2025-03-03T17:00:00Z"),
            },
            attachments: vec![],
            comments: vec![],
        }
    }

    fn texts(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.text.as_str()).collect()
    }

    const NOW: &str = "2025-03-05T10:00:00Z";

    #[test]
    fn resolving_sets_closed_at_and_one_comment() {
        let machine = TicketStateMachine::default();
        let before = ticket(Status::Open, "Other", None);
        let out = machine
            .apply(&before, &ChangeSet::default().with_status(Status::Resolved), &agent(), at(NOW))
            .unwrap();

        assert_eq!(out.ticket.status, Status::Resolved);
        assert_eq!(out.ticket.dates.closed_at, Some(at(NOW)));
        assert_eq!(texts(&out.emitted), vec!["status changed from Open to Resolved"]);
        assert!(out.emitted[0].is_system_generated);
        assert_eq!(out.emitted[0].author, "System (ann@helpdesk.io)");
        assert!(!out.partition_key_changed());
        assert_eq!(before.status, Status::Open, "input snapshot must be untouched");
    }

    #[test]
    fn closing_comment_follows_status_comment() {
        let machine = TicketStateMachine::default();
        let changes = ChangeSet::default()
            .with_status(Status::Rejected)
            .with_closing_comment("duplicate of 2025-0041");
        let out = machine
            .apply(&ticket(Status::Unread, "Other", None), &changes, &agent(), at(NOW))
            .unwrap();
        assert_eq!(
            texts(&out.emitted),
            vec!["status changed from Unread to Rejected", "duplicate of 2025-0041"]
        );
        assert!(out.emitted.iter().all(|c| c.is_system_generated));
    }

    #[test]
    fn closing_comment_without_closing_is_invalid() {
        let machine = TicketStateMachine::default();
        let changes = ChangeSet::default()
            .with_status(Status::Open)
            .with_closing_comment("nope");
        let err = machine
            .apply(&ticket(Status::Unread, "Other", None), &changes, &agent(), at(NOW))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidChangeSet);
    }

    #[test]
    fn closed_ticket_rejects_comment_without_reopen() {
        let machine = TicketStateMachine::default();
        let changes = ChangeSet::default().with_comment("still broken", None);
        let err = machine
            .apply(&ticket(Status::Resolved, "Other", None), &changes, &agent(), at(NOW))
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::ForbiddenTransition {
                from: Status::Resolved,
                to: None,
                ..
            }
        ));
    }

    #[test]
    fn closed_ticket_rejects_non_reopen_status() {
        let machine = TicketStateMachine::default();
        let changes = ChangeSet::default().with_status(Status::Rejected);
        let err = machine
            .apply(&ticket(Status::Resolved, "Other", None), &changes, &agent(), at(NOW))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForbiddenTransition);
    }

    #[test]
    fn reopen_clears_closed_at() {
        let machine = TicketStateMachine::default();
        let out = machine
            .apply(
                &ticket(Status::Rejected, "Other", None),
                &ChangeSet::default().with_status(Status::Open),
                &agent(),
                at(NOW),
            )
            .unwrap();
        assert_eq!(out.ticket.status, Status::Open);
        assert_eq!(out.ticket.dates.closed_at, None);
        assert_eq!(texts(&out.emitted), vec!["status changed from Rejected to Open"]);
    }

    #[test]
    fn reopen_ignores_other_fields() {
        let machine = TicketStateMachine::default();
        let changes = ChangeSet::default()
            .with_status(Status::Open)
            .with_category("Applications")
            .with_comment("again", None);
        let out = machine
            .apply(&ticket(Status::Resolved, "Other", None), &changes, &agent(), at(NOW))
            .unwrap();
        assert_eq!(out.emitted.len(), 1);
        assert_eq!(out.ticket.category.as_str(), "Other");
        assert!(!out.partition_key_changed());
    }

    #[test]
    fn open_ticket_cannot_return_to_unread() {
        let machine = TicketStateMachine::default();
        let err = machine
            .apply(
                &ticket(Status::Open, "Other", None),
                &ChangeSet::default().with_status(Status::Unread),
                &agent(),
                at(NOW),
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForbiddenTransition);
    }

    #[test]
    fn same_status_is_a_noop() {
        let machine = TicketStateMachine::default();
        let before = ticket(Status::Unread, "Other", None);
        let out = machine
            .apply(&before, &ChangeSet::default().with_status(Status::Unread), &agent(), at(NOW))
            .unwrap();
        assert!(out.is_noop());
        assert_eq!(out.ticket, before);
    }

    #[test]
    fn assignment_emits_comment_once() {
        let machine = TicketStateMachine::default();
        let changes = ChangeSet::default().with_person("kim@helpdesk.io");
        let out = machine
            .apply(&ticket(Status::Open, "Other", None), &changes, &agent(), at(NOW))
            .unwrap();
        assert_eq!(texts(&out.emitted), vec!["assigned to kim@helpdesk.io"]);

        let again = machine.apply(&out.ticket, &changes, &agent(), at(NOW)).unwrap();
        assert!(again.is_noop());
    }

    #[test]
    fn category_change_with_new_group_clears_person() {
        let machine = TicketStateMachine::default();
        let before = ticket(Status::Open, "Hardware", Some("kim@helpdesk.io"));
        let out = machine
            .apply(
                &before,
                &ChangeSet::default().with_category("Infrastructure"),
                &agent(),
                at(NOW),
            )
            .unwrap();

        assert_eq!(
            texts(&out.emitted),
            vec![
                "category changed from Hardware to Infrastructure",
                "group changed to infrastructure administrators",
                "person assignment removed due to group change",
            ]
        );
        assert_eq!(out.ticket.assigned_to.person, None);
        assert_eq!(
            out.relocation,
            Some(Relocation {
                from: Category::new("Hardware"),
                to: Category::new("Infrastructure"),
            })
        );
    }

    #[test]
    fn category_change_within_group_keeps_person() {
        let machine = TicketStateMachine::default();
        let before = ticket(Status::Open, "Hardware", Some("kim@helpdesk.io"));
        let out = machine
            .apply(&before, &ChangeSet::default().with_category("Account"), &agent(), at(NOW))
            .unwrap();
        assert_eq!(
            texts(&out.emitted),
            vec!["category changed from Hardware to Account"]
        );
        assert_eq!(out.ticket.assigned_to.person.as_deref(), Some("kim@helpdesk.io"));
        assert!(out.partition_key_changed());
    }

    #[test]
    fn group_change_without_person_emits_one_group_comment() {
        let machine = TicketStateMachine::default();
        let out = machine
            .apply(
                &ticket(Status::Open, "Other", None),
                &ChangeSet::default().with_category("Applications"),
                &agent(),
                at(NOW),
            )
            .unwrap();
        assert_eq!(
            texts(&out.emitted),
            vec![
                "category changed from Other to Applications",
                "group changed to application administrators",
            ]
        );
    }

    #[test]
    fn effects_follow_fixed_order() {
        let machine = TicketStateMachine::default();
        let attachment = Attachment {
            name: "log.txt".to_string(),
            url: "https://blobs/log.txt".to_string(),
        };
        let changes = ChangeSet::default()
            .with_comment("see attached log", Some(attachment.clone()))
            .with_category("Applications")
            .with_person("kim@helpdesk.io")
            .with_status(Status::Open);
        let out = machine
            .apply(&ticket(Status::Unread, "Other", None), &changes, &agent(), at(NOW))
            .unwrap();

        assert_eq!(
            texts(&out.emitted),
            vec![
                "status changed from Unread to Open",
                "assigned to kim@helpdesk.io",
                "category changed from Other to Applications",
                "group changed to application administrators",
                "person assignment removed due to group change",
                "see attached log",
            ]
        );
        let user = out.emitted.last().unwrap();
        assert!(!user.is_system_generated);
        assert_eq!(user.author, "ann@helpdesk.io");
        assert_eq!(user.attachment, Some(attachment));
        assert_eq!(out.ticket.comments, out.emitted);
    }

    #[test]
    fn existing_comments_are_preserved_in_order() {
        let machine = TicketStateMachine::default();
        let mut before = ticket(Status::Open, "Other", None);
        before.comments.push(Comment::user(&agent(), "first", None, at("2025-03-03T10:00:00Z")));
        let out = machine
            .apply(&before, &ChangeSet::default().with_comment("second", None), &agent(), at(NOW))
            .unwrap();
        assert_eq!(texts(&out.ticket.comments), vec!["first", "second"]);
    }

    #[test]
    fn empty_change_set_is_invalid() {
        let machine = TicketStateMachine::default();
        let err = machine
            .apply(&ticket(Status::Open, "Other", None), &ChangeSet::default(), &agent(), at(NOW))
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidChangeSet("no recognized field present".to_string())
        );
    }

    #[test]
    fn blank_fields_are_invalid() {
        let machine = TicketStateMachine::default();
        let open = ticket(Status::Open, "Other", None);
        for changes in [
            ChangeSet::default().with_person("  "),
            ChangeSet::default().with_category(""),
            ChangeSet::default().with_comment("\n", None),
        ] {
            let err = machine.apply(&open, &changes, &agent(), at(NOW)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidChangeSet);
        }
    }

    #[test]
    fn deadline_is_not_recomputed_on_category_change() {
        let machine = TicketStateMachine::default();
        let before = ticket(Status::Open, "Other", None);
        let out = machine
            .apply(&before, &ChangeSet::default().with_category("Hardware"), &agent(), at(NOW))
            .unwrap();
        assert_eq!(
            out.ticket.dates.guaranteed_resolution_at,
            before.dates.guaranteed_resolution_at
        );
    }
}
