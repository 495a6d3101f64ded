use crate::commands::Out;
use crate::model::{MappingStore, MappingTable};
use crate::{Config, Result};
use std::path::Path;

/// Finds and validates the mapping document, returning it in its normalized form: codes as
/// strings, event codes zero-padded and duplicates removed.
///
/// # Errors
/// - Returns an error if no mapping document can be found or if it is invalid.
pub async fn mapping(config: &Config, explicit: Option<&Path>) -> Result<Out<MappingTable>> {
    let path = config.find_mapping(explicit)?;
    let store = MappingStore::open(&path)?;
    let table = store.snapshot();
    let categories = table.categories().count();
    Ok(Out::new(
        format!(
            "{} is valid: {} entries in {} categories",
            path.display(),
            table.len(),
            categories
        ),
        table.as_ref().clone(),
    ))
}
