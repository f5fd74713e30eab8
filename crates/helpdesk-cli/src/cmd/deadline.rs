//! `hd deadline`: compute a guaranteed-resolution time without a ticket.

use crate::cmd::{Globals, human_time};
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use helpdesk_core::BusinessCalendar;
use helpdesk_core::model::Category;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct DeadlineArgs {
    /// Ticket category; unknown names use the default SLA.
    #[arg(long, default_value = Category::OTHER)]
    pub category: String,

    /// Start instant (RFC 3339). Defaults to now.
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeadlineReport {
    category: Category,
    start: DateTime<Utc>,
    working_minutes: i64,
    working_hours: String,
    group: String,
    guaranteed_resolution_at: DateTime<Utc>,
}

pub fn run_deadline(args: &DeadlineArgs, globals: &Globals, output: OutputMode) -> Result<()> {
    let machine = globals.machine()?;
    let category = Category::new(args.category.trim());
    let start = args.start.unwrap_or_else(|| globals.now());

    let report = DeadlineReport {
        working_minutes: machine.sla().duration_minutes(&category),
        working_hours: describe_window(machine.sla().calendar()),
        group: machine.router().group_for(&category).to_string(),
        guaranteed_resolution_at: machine.sla().deadline(start, &category),
        category,
        start,
    };

    render(output, &report, |r, w| {
        pretty_kv(w, "Category", r.category.as_str())?;
        pretty_kv(w, "Group", &r.group)?;
        pretty_kv(w, "Start", human_time(r.start))?;
        pretty_kv(
            w,
            "SLA",
            format!("{}h{:02}m working time", r.working_minutes / 60, r.working_minutes % 60),
        )?;
        pretty_kv(w, "Hours", &r.working_hours)?;
        pretty_kv(w, "Due", human_time(r.guaranteed_resolution_at))
    })
}

/// Working window as `Mon-Fri HH:MM-HH:MM UTC+hh:mm`.
fn describe_window(calendar: &BusinessCalendar) -> String {
    format!(
        "Mon-Fri {}-{} UTC{}",
        calendar.opening().format("%H:%M"),
        calendar.closing().format("%H:%M"),
        calendar.offset()
    )
}
