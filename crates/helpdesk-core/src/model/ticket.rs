use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The four ticket lifecycle states.
///
/// `Unread` is the initial marker every ticket is created with. For
/// transition purposes it behaves exactly like `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Unread,
    Open,
    Resolved,
    Rejected,
}

impl Status {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Unread, Self::Open, Self::Resolved, Self::Rejected];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "Unread",
            Self::Open => "Open",
            Self::Resolved => "Resolved",
            Self::Rejected => "Rejected",
        }
    }

    /// Resolved and Rejected are terminal until the ticket is reopened.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Ok(Self::Unread),
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// Ticket category. Doubles as the document store's partition key.
///
/// Categories are open-ended: names outside the built-in set are carried
/// through unchanged and resolve to the policy defaults.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const SOFTWARE_INSTALL: &'static str = "Software-Install";
    pub const SOFTWARE_CONFIG: &'static str = "Software-Config";
    pub const HARDWARE: &'static str = "Hardware";
    pub const INFRASTRUCTURE: &'static str = "Infrastructure";
    pub const ACCOUNT: &'static str = "Account";
    pub const APPLICATIONS: &'static str = "Applications";
    pub const OTHER: &'static str = "Other";
    pub const UNASSIGNED: &'static str = "Unassigned";

    /// Built-in category names.
    pub const BUILTIN: [&'static str; 8] = [
        Self::SOFTWARE_INSTALL,
        Self::SOFTWARE_CONFIG,
        Self::HARDWARE,
        Self::INFRASTRUCTURE,
        Self::ACCOUNT,
        Self::APPLICATIONS,
        Self::OTHER,
        Self::UNASSIGNED,
    ];

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Category assigned to freshly created tickets.
    #[must_use]
    pub fn other() -> Self {
        Self::new(Self::OTHER)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Support group responsible for a ticket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportGroup(String);

impl SupportGroup {
    pub const FIRST_LINE: &'static str = "first-line support";
    pub const INFRASTRUCTURE_ADMINS: &'static str = "infrastructure administrators";
    pub const APPLICATION_ADMINS: &'static str = "application administrators";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn first_line() -> Self {
        Self::new(Self::FIRST_LINE)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SupportGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SupportGroup {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque reference to an uploaded blob. Passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// A resolved principal: who is acting and which roles they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    #[must_use]
    pub fn new<I, S>(email: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            email: email.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Author label used for engine-generated audit comments.
    #[must_use]
    pub fn system_label(&self) -> String {
        format!("System ({})", self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub person: Option<String>,
    pub group: SupportGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDates {
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub guaranteed_resolution_at: DateTime<Utc>,
}

/// One entry in a ticket's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "isSystemComment")]
    pub is_system_generated: bool,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

impl Comment {
    /// Audit entry authored by the engine on behalf of `actor`.
    #[must_use]
    pub fn system(actor: &Actor, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            author: actor.system_label(),
            text: text.into(),
            timestamp: at,
            is_system_generated: true,
            attachment: None,
        }
    }

    /// Comment written by a human actor.
    #[must_use]
    pub fn user(
        actor: &Actor,
        text: impl Into<String>,
        attachment: Option<Attachment>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            author: actor.email.clone(),
            text: text.into(),
            timestamp: at,
            is_system_generated: false,
            attachment,
        }
    }
}

/// Full ticket document as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub status: Status,
    pub reporting_user: ReportingUser,
    pub assigned_to: Assignment,
    pub dates: TicketDates,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Ticket {
    /// The store partition this document lives in.
    #[must_use]
    pub const fn partition_key(&self) -> &Category {
        &self.category
    }

    /// Optimistic-concurrency token. Comments are append-only, so every
    /// audited change grows this number.
    #[must_use]
    pub fn version(&self) -> usize {
        self.comments.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeChange {
    #[serde(default)]
    pub person: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub text: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

/// Caller-proposed changes to one ticket. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeSet {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub assigned_to: Option<AssigneeChange>,
    pub new_comment: Option<NewComment>,
    pub closing_comment: Option<String>,
}

impl ChangeSet {
    /// The person assignment, if one was proposed.
    #[must_use]
    pub fn person(&self) -> Option<&str> {
        self.assigned_to.as_ref().and_then(|a| a.person.as_deref())
    }

    /// True when no recognized field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.category.is_none()
            && self.person().is_none()
            && self.new_comment.is_none()
            && self.closing_comment.is_none()
    }

    /// Names of the populated fields other than `status`.
    #[must_use]
    pub fn non_status_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.category.is_some() {
            fields.push("category");
        }
        if self.person().is_some() {
            fields.push("assignedTo.person");
        }
        if self.new_comment.is_some() {
            fields.push("newComment");
        }
        if self.closing_comment.is_some() {
            fields.push("closingComment");
        }
        fields
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_person(mut self, person: impl Into<String>) -> Self {
        self.assigned_to = Some(AssigneeChange {
            person: Some(person.into()),
        });
        self
    }

    #[must_use]
    pub fn with_comment(mut self, text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        self.new_comment = Some(NewComment {
            text: text.into(),
            attachment,
        });
        self
    }

    #[must_use]
    pub fn with_closing_comment(mut self, text: impl Into<String>) -> Self {
        self.closing_comment = Some(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_and_parse() {
        for status in Status::ALL {
            let parsed: Status = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
        assert_eq!(" resolved ".parse::<Status>().unwrap(), Status::Resolved);
        assert!("closed".parse::<Status>().is_err());
    }

    #[test]
    fn only_resolved_and_rejected_are_closed() {
        assert!(!Status::Unread.is_closed());
        assert!(!Status::Open.is_closed());
        assert!(Status::Resolved.is_closed());
        assert!(Status::Rejected.is_closed());
    }

    #[test]
    fn status_serializes_as_pascal_case() {
        assert_eq!(serde_json::to_string(&Status::Unread).unwrap(), "\"Unread\"");
        let parsed: Status = serde_json::from_str("\"Rejected\"").unwrap();
        assert_eq!(parsed, Status::Rejected);
    }

    #[test]
    fn unknown_category_round_trips() {
        let cat: Category = serde_json::from_str("\"Printers\"").unwrap();
        assert_eq!(cat.as_str(), "Printers");
        assert_eq!(serde_json::to_string(&cat).unwrap(), "\"Printers\"");
    }

    #[test]
    fn legacy_system_comment_flag_is_accepted() {
        let json = r#"{
            "author": "System (a@x.io)",
            "text": "status changed from Unread to Open",
            "timestamp": "2025-03-03T09:00:00Z",
            "isSystemComment": true
        }"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert!(comment.is_system_generated);
        assert!(comment.attachment.is_none());
    }

    #[test]
    fn empty_change_set_is_detected() {
        assert!(ChangeSet::default().is_empty());
        let only_blank_assignee = ChangeSet {
            assigned_to: Some(AssigneeChange { person: None }),
            ..ChangeSet::default()
        };
        assert!(only_blank_assignee.is_empty());
        assert!(!ChangeSet::default().with_status(Status::Open).is_empty());
    }

    #[test]
    fn change_set_parses_wire_shape() {
        let json = r#"{
            "status": "Resolved",
            "assignedTo": { "person": "kim@x.io" },
            "newComment": { "text": "done" },
            "closingComment": "fixed by reboot"
        }"#;
        let changes: ChangeSet = serde_json::from_str(json).unwrap();
        assert_eq!(changes.status, Some(Status::Resolved));
        assert_eq!(changes.person(), Some("kim@x.io"));
        assert_eq!(changes.new_comment.as_ref().unwrap().text, "done");
        assert_eq!(
            changes.non_status_fields(),
            vec!["assignedTo.person", "newComment", "closingComment"]
        );
    }

    #[test]
    fn system_label_wraps_actor_email() {
        let actor = Actor::new("ann@x.io", ["sd"]);
        assert_eq!(actor.system_label(), "System (ann@x.io)");
        assert!(actor.has_role("sd"));
        assert!(!actor.has_role("admin"));
    }
}
