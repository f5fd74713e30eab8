//! Actor identity resolution for CLI commands.
//!
//! Email: `--actor` flag > `HD_ACTOR` env. Roles: `--role` flags (repeatable)
//! > `HD_ROLES` env (comma-separated). Commands that write tickets require an
//! email; read-only commands work without one.

use helpdesk_core::model::Actor;
use std::env;

/// Errors from actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    pub message: String,
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn resolve_email_with(flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(email) = flag.map(str::trim).filter(|e| !e.is_empty()) {
        return Some(email.to_string());
    }
    env.get("HD_ACTOR").map(|v| v.trim().to_string())
}

fn resolve_roles_with(flags: &[String], env: &dyn EnvReader) -> Vec<String> {
    let from_flags: Vec<String> = flags
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if !from_flags.is_empty() {
        return from_flags;
    }
    env.get("HD_ROLES")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn require_actor_with(
    flag: Option<&str>,
    roles: &[String],
    env: &dyn EnvReader,
) -> Result<Actor, ActorResolutionError> {
    let email = resolve_email_with(flag, env).ok_or_else(|| ActorResolutionError {
        message: "Actor identity required for this command. Set --actor or HD_ACTOR.".to_string(),
    })?;
    Ok(Actor::new(email, resolve_roles_with(roles, env)))
}

/// Resolve the acting principal, failing when no email is available.
pub fn require_actor(flag: Option<&str>, roles: &[String]) -> Result<Actor, ActorResolutionError> {
    require_actor_with(flag, roles, &RealEnv)
}
