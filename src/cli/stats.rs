//! Store statistics CLI command

use crate::display::format_counts;
use crate::error::PropdeskResult;
use crate::storage::Storage;

/// Print the number of stored records per entity type
pub fn handle_stats_command(storage: &Storage) -> PropdeskResult<()> {
    if !storage.is_initialized() {
        println!("Store not initialized. Run 'propdesk init' first.");
        return Ok(());
    }

    let counts = storage
        .counts()?
        .into_iter()
        .map(|(entity_type, count)| (entity_type, count as u64));

    println!("Store: {}", storage.paths().store_file().display());
    println!();
    println!("{}", format_counts(counts));
    Ok(())
}
