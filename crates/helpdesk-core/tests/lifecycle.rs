//! End-to-end ticket lifecycle through the service and the file store.

use chrono::{DateTime, Utc};
use helpdesk_core::intake::NewTicket;
use helpdesk_core::machine::TransitionError;
use helpdesk_core::model::{Actor, Category, ChangeSet, Status, SupportGroup};
use helpdesk_core::service::{AccessPolicy, ServiceError, TicketService, UpdateRequest};
use helpdesk_core::store::{FileRepository, StoreLock, TicketRepository};
use helpdesk_core::{ErrorCode, TicketStateMachine};
use std::time::Duration;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn agent() -> Actor {
    Actor::new("ann@helpdesk.io", ["sd"])
}

fn reporter() -> Actor {
    Actor::new("bob@corp.io", ["user"])
}

fn service(root: &TempDir) -> TicketService<FileRepository> {
    let (repo, _) = FileRepository::init(root.path()).expect("init store");
    TicketService::new(TicketStateMachine::default(), AccessPolicy::default(), repo)
}

fn open_ticket(svc: &mut TicketService<FileRepository>, id: &str, now: &str) {
    svc.create(
        id,
        &NewTicket {
            title: "VPN drops".to_string(),
            content: "Disconnects every ten minutes".to_string(),
            attachment: None,
        },
        &reporter(),
        at(now),
    )
    .expect("create ticket");
}

fn update(
    svc: &mut TicketService<FileRepository>,
    changes: ChangeSet,
    now: &str,
) -> Result<helpdesk_core::service::UpdateOutcome, ServiceError> {
    svc.update(
        &UpdateRequest {
            ticket_id: "2025-0001".to_string(),
            changes,
        },
        &agent(),
        at(now),
        None,
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn friday_afternoon_ticket_is_due_monday() {
    let root = TempDir::new().unwrap();
    let mut svc = service(&root);
    // Friday 15:30: 30 minutes on Friday, 7.5 hours on Monday.
    open_ticket(&mut svc, "2025-0001", "2025-03-07T15:30:00Z");

    let stored = svc.get("2025-0001").unwrap();
    assert_eq!(stored.category, Category::other());
    assert_eq!(
        stored.dates.guaranteed_resolution_at,
        at("2025-03-10T15:30:00Z")
    );
}

#[test]
fn resolved_ticket_refuses_comments_until_reopened() {
    let root = TempDir::new().unwrap();
    let mut svc = service(&root);
    open_ticket(&mut svc, "2025-0001", "2025-03-04T09:00:00Z");
    update(&mut svc, ChangeSet::default().with_status(Status::Open), "2025-03-04T09:10:00Z")
        .unwrap();

    let resolved = update(
        &mut svc,
        ChangeSet::default().with_status(Status::Resolved),
        "2025-03-04T11:00:00Z",
    )
    .unwrap();
    assert_eq!(resolved.ticket.status, Status::Resolved);
    assert_eq!(
        resolved.ticket.dates.closed_at,
        Some(at("2025-03-04T11:00:00Z"))
    );
    assert_eq!(resolved.emitted.len(), 1);

    let err = update(
        &mut svc,
        ChangeSet::default().with_comment("still broken", None),
        "2025-03-04T12:00:00Z",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::ForbiddenTransition { .. })
    ));
    assert_eq!(err.code(), ErrorCode::ForbiddenTransition);

    // The refused call left the stored document untouched.
    let stored = svc.get("2025-0001").unwrap();
    assert_eq!(stored.status, Status::Resolved);
    assert_eq!(stored.comments.len(), 2);

    let reopened = update(
        &mut svc,
        ChangeSet::default().with_status(Status::Open),
        "2025-03-04T13:00:00Z",
    )
    .unwrap();
    assert_eq!(reopened.ticket.status, Status::Open);
    assert_eq!(reopened.ticket.dates.closed_at, None);
    assert_eq!(reopened.emitted.len(), 1);
    assert_eq!(
        reopened.emitted[0].text,
        "status changed from Resolved to Open"
    );
    assert!(reopened.emitted[0].is_system_generated);

    update(
        &mut svc,
        ChangeSet::default().with_comment("still broken", None),
        "2025-03-04T13:05:00Z",
    )
    .unwrap();
    assert_eq!(svc.get("2025-0001").unwrap().comments.len(), 4);
}

#[test]
fn category_move_reroutes_and_relocates() {
    let root = TempDir::new().unwrap();
    let mut svc = service(&root);
    open_ticket(&mut svc, "2025-0001", "2025-03-04T09:00:00Z");
    update(
        &mut svc,
        ChangeSet::default().with_person("carl@helpdesk.io"),
        "2025-03-04T09:05:00Z",
    )
    .unwrap();

    let outcome = update(
        &mut svc,
        ChangeSet::default().with_category(Category::APPLICATIONS),
        "2025-03-04T09:30:00Z",
    )
    .unwrap();

    let texts: Vec<&str> = outcome.emitted.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "category changed from Other to Applications",
            "group changed to application administrators",
            "person assignment removed due to group change",
        ]
    );
    assert_eq!(outcome.ticket.assigned_to.person, None);
    assert_eq!(
        outcome.ticket.assigned_to.group,
        SupportGroup::new(SupportGroup::APPLICATION_ADMINS)
    );
    // Deadline is fixed at creation.
    assert_eq!(
        outcome.ticket.dates.guaranteed_resolution_at,
        at("2025-03-05T09:00:00Z")
    );

    let relocation = outcome.relocation.expect("category move relocates");
    assert_eq!(relocation.from, Category::other());
    assert_eq!(relocation.to, Category::new(Category::APPLICATIONS));

    let all = svc.list().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].category, Category::new(Category::APPLICATIONS));
}

#[test]
fn unknown_category_degrades_to_defaults() {
    let root = TempDir::new().unwrap();
    let mut svc = service(&root);
    open_ticket(&mut svc, "2025-0001", "2025-03-04T09:00:00Z");
    let outcome = update(
        &mut svc,
        ChangeSet::default().with_category("Printers"),
        "2025-03-04T09:30:00Z",
    )
    .unwrap();
    assert_eq!(outcome.ticket.assigned_to.group, SupportGroup::first_line());
    assert_eq!(outcome.emitted.len(), 1);
}

#[test]
fn empty_change_set_is_invalid() {
    let root = TempDir::new().unwrap();
    let mut svc = service(&root);
    open_ticket(&mut svc, "2025-0001", "2025-03-04T09:00:00Z");
    let err = update(&mut svc, ChangeSet::default(), "2025-03-04T09:30:00Z").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidChangeSet);
}

#[test]
fn tickets_survive_reopening_the_store() {
    let root = TempDir::new().unwrap();
    {
        let mut svc = service(&root);
        open_ticket(&mut svc, "2025-0001", "2025-03-04T09:00:00Z");
        open_ticket(&mut svc, "2025-0002", "2025-03-04T09:05:00Z");
    }
    let repo = FileRepository::open(root.path()).unwrap();
    let ids: Vec<String> = repo.list().unwrap().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["2025-0001", "2025-0002"]);
}

#[test]
fn writers_serialize_on_the_store_lock() {
    let root = TempDir::new().unwrap();
    let (repo, _) = FileRepository::init(root.path()).unwrap();
    let held = StoreLock::exclusive(&repo.lock_path(), Duration::from_millis(50)).unwrap();
    let contended = StoreLock::exclusive(&repo.lock_path(), Duration::from_millis(50));
    assert!(contended.is_err());
    held.release();
    assert!(StoreLock::exclusive(&repo.lock_path(), Duration::from_millis(50)).is_ok());
}
