use crate::cmd::Globals;
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use helpdesk_core::config::config_path;
use helpdesk_core::store::FileRepository;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.helpdesk/config.toml` with the defaults.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "\
[calendar]\n\
opening_hour = 8\n\
closing_hour = 16\n\
utc_offset_minutes = 0\n\
\n\
[sla]\n\
default_hours = 8\n\
\n\
# Per-category resolution hours, on top of the built-in table.\n\
[sla.hours]\n\
# \"Hardware\" = 24\n\
\n\
[routing]\n\
default_group = \"first-line support\"\n\
\n\
# Per-category support groups, on top of the built-in table.\n\
[routing.groups]\n\
# \"Applications\" = \"application administrators\"\n\
\n\
[access]\n\
agent_role = \"sd\"\n";

#[derive(Debug, Serialize)]
struct InitReport {
    store: String,
    config: String,
    created_store: bool,
    wrote_config: bool,
}

/// Execute `hd init`. Creates the project skeleton:
///
/// ```text
/// .helpdesk/
///   tickets.json   (empty JSON array)
///   config.toml    (default engine config)
/// ```
///
/// Existing tickets are never touched. An existing config is kept unless
/// `--force` is given.
pub fn run_init(args: &InitArgs, globals: &Globals, output: OutputMode) -> Result<()> {
    let (repo, created_store) = FileRepository::init(&globals.project_root)?;

    let config = config_path(&globals.project_root);
    let wrote_config = args.force || !config.exists();
    if wrote_config {
        std::fs::write(&config, CONFIG_TOML)
            .with_context(|| format!("Failed to write config: {}", config.display()))?;
    }
    tracing::info!(store = %repo.dir().display(), created_store, wrote_config, "initialized");

    let report = InitReport {
        store: repo.dir().display().to_string(),
        config: config.display().to_string(),
        created_store,
        wrote_config,
    };
    render(output, &report, |r, w| {
        if r.created_store {
            writeln!(w, "✓ Initialized .helpdesk/ ticket store.")?;
        } else {
            writeln!(w, "✓ .helpdesk/ already initialized; tickets kept.")?;
        }
        pretty_kv(w, "Store", &r.store)?;
        pretty_kv(
            w,
            "Config",
            if r.wrote_config {
                r.config.clone()
            } else {
                format!("{} (kept)", r.config)
            },
        )
    })
}
