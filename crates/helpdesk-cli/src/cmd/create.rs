use crate::actor::require_actor;
use crate::cmd::Globals;
use crate::cmd::show::write_ticket;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use helpdesk_core::intake::NewTicket;
use helpdesk_core::model::Attachment;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Ticket id, assigned by the caller.
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub title: String,

    /// Problem description.
    #[arg(long)]
    pub content: String,

    /// Name of an attachment already uploaded elsewhere.
    #[arg(long, requires = "attachment_url")]
    pub attachment_name: Option<String>,

    #[arg(long, requires = "attachment_name")]
    pub attachment_url: Option<String>,
}

impl CreateArgs {
    fn attachment(&self) -> Option<Attachment> {
        match (&self.attachment_name, &self.attachment_url) {
            (Some(name), Some(url)) => Some(Attachment {
                name: name.clone(),
                url: url.clone(),
            }),
            _ => None,
        }
    }
}

/// Execute `hd create`. The acting principal is recorded as the reporter.
pub fn run_create(args: &CreateArgs, globals: &Globals, output: OutputMode) -> Result<()> {
    let reporter = require_actor(globals.actor.as_deref(), &globals.roles)?;
    let request = NewTicket {
        title: args.title.clone(),
        content: args.content.clone(),
        attachment: args.attachment(),
    };

    let _lock = globals.write_lock()?;
    let mut service = globals.service()?;
    let ticket = service.create(args.id.trim(), &request, &reporter, globals.now())?;

    render(output, &ticket, |t, w| write_ticket(w, t))
}
