//! `hd show`: display one ticket with its full comment history.

use crate::cmd::{Globals, human_time};
use crate::output::{OutputMode, pretty_kv, pretty_section, render};
use anyhow::Result;
use clap::Args;
use helpdesk_core::model::{Comment, Ticket};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket id to display.
    pub id: String,
}

pub fn run_show(args: &ShowArgs, globals: &Globals, output: OutputMode) -> Result<()> {
    let _lock = globals.read_lock()?;
    let service = globals.service()?;
    let ticket = service.get(args.id.trim())?;
    render(output, &ticket, |t, w| write_ticket(w, t))
}

/// Human layout of a ticket, shared with `create` and `update`.
pub fn write_ticket(w: &mut dyn Write, ticket: &Ticket) -> io::Result<()> {
    pretty_section(w, &format!("{}  {}", ticket.id, ticket.title))?;
    pretty_kv(w, "Status", ticket.status.as_str())?;
    pretty_kv(w, "Category", ticket.category.as_str())?;
    pretty_kv(w, "Group", ticket.assigned_to.group.as_str())?;
    pretty_kv(
        w,
        "Assignee",
        ticket.assigned_to.person.as_deref().unwrap_or("-"),
    )?;
    pretty_kv(w, "Reporter", &ticket.reporting_user.email)?;
    pretty_kv(w, "Created", human_time(ticket.dates.created_at))?;
    pretty_kv(w, "Due", human_time(ticket.dates.guaranteed_resolution_at))?;
    pretty_kv(
        w,
        "Closed",
        ticket
            .dates
            .closed_at
            .map_or_else(|| "-".to_string(), human_time),
    )?;
    pretty_kv(w, "Version", ticket.version().to_string())?;
    for attachment in &ticket.attachments {
        pretty_kv(w, "Attachment", format!("{} <{}>", attachment.name, attachment.url))?;
    }
    writeln!(w)?;
    writeln!(w, "{}", ticket.content)?;
    if !ticket.comments.is_empty() {
        writeln!(w)?;
        writeln!(w, "Comments:")?;
        write_comments(w, &ticket.comments)?;
    }
    Ok(())
}

pub fn write_comments(w: &mut dyn Write, comments: &[Comment]) -> io::Result<()> {
    for comment in comments {
        writeln!(
            w,
            "  [{}] {}: {}",
            human_time(comment.timestamp),
            comment.author,
            comment.text
        )?;
    }
    Ok(())
}
