use crate::cmd::{Globals, human_time};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use helpdesk_core::model::{Status, Ticket};
use std::io::Write;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only tickets in this status (Unread, Open, Resolved, Rejected).
    #[arg(long)]
    pub status: Option<Status>,

    /// Only tickets in this category.
    #[arg(long)]
    pub category: Option<String>,

    /// Only tickets that are still open (Unread or Open).
    #[arg(long, conflicts_with = "status")]
    pub open: bool,
}

impl ListArgs {
    fn matches(&self, ticket: &Ticket) -> bool {
        if self.open && ticket.status.is_closed() {
            return false;
        }
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        self.category
            .as_deref()
            .is_none_or(|c| ticket.category.as_str() == c.trim())
    }
}

pub fn run_list(args: &ListArgs, globals: &Globals, output: OutputMode) -> Result<()> {
    let _lock = globals.read_lock()?;
    let service = globals.service()?;
    let tickets: Vec<Ticket> = service
        .list()?
        .into_iter()
        .filter(|t| args.matches(t))
        .collect();

    render(output, &tickets, |items, w| {
        if items.is_empty() {
            return writeln!(w, "No tickets.");
        }
        writeln!(
            w,
            "{:<12} {:<9} {:<18} {:<20} TITLE",
            "ID", "STATUS", "CATEGORY", "DUE"
        )?;
        for t in items {
            writeln!(
                w,
                "{:<12} {:<9} {:<18} {:<20} {}",
                t.id,
                t.status.as_str(),
                t.category.as_str(),
                human_time(t.dates.guaranteed_resolution_at),
                t.title
            )?;
        }
        Ok(())
    })
}
