//! Audit log CLI command

use crate::audit::AuditLogger;
use crate::config::paths::PropdeskPaths;
use crate::display::format_audit_entries;
use crate::error::PropdeskResult;
use crate::models::EntityType;

/// Print the most recent audit entries, optionally for one entity type
pub fn handle_audit_command(
    paths: &PropdeskPaths,
    count: usize,
    entity_type: Option<EntityType>,
) -> PropdeskResult<()> {
    let logger = AuditLogger::new(paths.audit_log());
    let entries = match entity_type {
        Some(entity_type) => logger.read_recent_for(entity_type, count)?,
        None => logger.read_recent(count)?,
    };

    println!("{}", format_audit_entries(&entries));
    Ok(())
}
