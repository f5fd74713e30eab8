use std::fmt;

/// Machine-readable error codes shared by the engine, the store and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidConfig,
    TicketNotFound,
    ForbiddenTransition,
    InvalidChangeSet,
    InvalidRequest,
    Unauthorized,
    VersionConflict,
    DuplicateTicket,
    StoreWriteFailed,
    LockContention,
    RelocationIncomplete,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidConfig => "E1003",
            Self::TicketNotFound => "E2001",
            Self::ForbiddenTransition => "E2002",
            Self::InvalidChangeSet => "E2003",
            Self::InvalidRequest => "E2004",
            Self::Unauthorized => "E2005",
            Self::VersionConflict => "E2006",
            Self::DuplicateTicket => "E3001",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::RelocationIncomplete => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Helpdesk store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidConfig => "Invalid engine configuration",
            Self::TicketNotFound => "Ticket not found",
            Self::ForbiddenTransition => "Forbidden status transition",
            Self::InvalidChangeSet => "Invalid change set",
            Self::InvalidRequest => "Invalid ticket request",
            Self::Unauthorized => "Actor is not allowed to perform this action",
            Self::VersionConflict => "Ticket changed since it was read",
            Self::DuplicateTicket => "Ticket id already exists",
            Self::StoreWriteFailed => "Ticket store write failed",
            Self::LockContention => "Lock contention",
            Self::RelocationIncomplete => "Partition relocation left a stale document",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `hd init` to create the .helpdesk directory."),
            Self::ConfigParseError => Some("Fix syntax in .helpdesk/config.toml and retry."),
            Self::InvalidConfig => {
                Some("Working hours must satisfy opening < closing within one day.")
            }
            Self::TicketNotFound | Self::InvalidChangeSet => None,
            Self::ForbiddenTransition => {
                Some("Reopen the ticket (status Open) before changing anything else.")
            }
            Self::InvalidRequest => Some("Provide a non-empty title and content."),
            Self::Unauthorized => Some("Retry as an actor holding the agent role."),
            Self::VersionConflict => Some("Reload the ticket and reapply the change set."),
            Self::DuplicateTicket => Some("Pick an unused ticket id."),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `hd` process releases its lock."),
            Self::RelocationIncomplete => {
                Some("Delete the stale document under the old category by hand.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
