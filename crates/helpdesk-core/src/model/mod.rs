pub mod ticket;

pub use ticket::{
    Actor, AssigneeChange, Assignment, Attachment, Category, ChangeSet, Comment, NewComment,
    ParseEnumError, ReportingUser, Status, SupportGroup, Ticket, TicketDates,
};
