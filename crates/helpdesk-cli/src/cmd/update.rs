//! `hd update`: apply a change set to one ticket.
//!
//! Changes come from flags, from a JSON change-set file (`--changes`), or
//! both; flags override the matching fields of the file.

use crate::actor::require_actor;
use crate::cmd::Globals;
use crate::cmd::show::{write_comments, write_ticket};
use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use clap::Args;
use helpdesk_core::model::{AssigneeChange, Category, ChangeSet, NewComment, Status};
use helpdesk_core::service::UpdateRequest;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Ticket id to update.
    pub id: String,

    /// New status (Open, Resolved, Rejected). `Open` on a closed ticket
    /// reopens it.
    #[arg(long)]
    pub status: Option<Status>,

    /// New category; the support group is re-derived from it.
    #[arg(long)]
    pub category: Option<String>,

    /// Assign a person.
    #[arg(long, value_name = "EMAIL")]
    pub assign: Option<String>,

    /// Add a comment.
    #[arg(long, value_name = "TEXT")]
    pub comment: Option<String>,

    /// Comment recorded alongside a Resolved/Rejected transition.
    #[arg(long, value_name = "TEXT")]
    pub closing_comment: Option<String>,

    /// Read a JSON change set from this file (`-` for stdin).
    #[arg(long, value_name = "FILE")]
    pub changes: Option<PathBuf>,

    /// Refuse the update unless the ticket is still at this version.
    #[arg(long, value_name = "N")]
    pub expect_version: Option<usize>,
}

impl UpdateArgs {
    fn change_set(&self) -> Result<ChangeSet> {
        let mut changes = match &self.changes {
            Some(path) => read_change_set(path)?,
            None => ChangeSet::default(),
        };
        if let Some(status) = self.status {
            changes.status = Some(status);
        }
        if let Some(category) = &self.category {
            changes.category = Some(Category::new(category.trim()));
        }
        if let Some(person) = &self.assign {
            changes.assigned_to = Some(AssigneeChange {
                person: Some(person.clone()),
            });
        }
        if let Some(text) = &self.comment {
            changes.new_comment = Some(NewComment {
                text: text.clone(),
                attachment: None,
            });
        }
        if let Some(text) = &self.closing_comment {
            changes.closing_comment = Some(text.clone());
        }
        Ok(changes)
    }
}

fn read_change_set(path: &Path) -> Result<ChangeSet> {
    let raw = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read change set from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid change set in {}", path.display()))
}

pub fn run_update(args: &UpdateArgs, globals: &Globals, output: OutputMode) -> Result<()> {
    let actor = require_actor(globals.actor.as_deref(), &globals.roles)?;
    let request = UpdateRequest {
        ticket_id: args.id.trim().to_string(),
        changes: args.change_set()?,
    };

    let _lock = globals.write_lock()?;
    let mut service = globals.service()?;
    let outcome = service.update(&request, &actor, globals.now(), args.expect_version)?;

    render(output, &outcome, |o, w| {
        if o.emitted.is_empty() {
            writeln!(w, "No changes.")?;
            writeln!(w)?;
        } else {
            writeln!(w, "✓ Updated {}:", o.ticket.id)?;
            write_comments(w, &o.emitted)?;
            if let Some(relocation) = &o.relocation {
                writeln!(w, "  moved from partition {} to {}", relocation.from, relocation.to)?;
            }
            writeln!(w)?;
        }
        write_ticket(w, &o.ticket)
    })
}
