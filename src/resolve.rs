//! Container identifier resolution.
//!
//! Maps a user-supplied id prefix or name to the runtime's canonical
//! container id. Every call re-queries the runtime so resolution never
//! works from a stale listing.

use crate::runtime::{ContainerRuntime, RuntimeError};

/// Resolves `id_or_name` to a canonical container id.
///
/// The first container in the runtime's listing order wins: for each
/// candidate the id prefix is checked before its names, and names match
/// with or without the runtime's leading `/`. An ambiguous prefix silently
/// picks the first hit; there is no uniqueness check.
///
/// # Errors
/// Returns [`RuntimeError::ContainerNotFound`] echoing the input when no
/// container matches, including for empty input.
pub async fn resolve_container_id(
    runtime: &dyn ContainerRuntime,
    id_or_name: &str,
) -> Result<String, RuntimeError> {
    if id_or_name.is_empty() {
        // An empty prefix would match every container; treat it as a miss.
        return Err(RuntimeError::ContainerNotFound(String::new()));
    }

    let containers = runtime.list_containers(true).await?;
    for container in containers {
        if container.id.starts_with(id_or_name) {
            return Ok(container.id);
        }
        for name in &container.names {
            if name == id_or_name || name.trim_start_matches('/') == id_or_name {
                return Ok(container.id);
            }
        }
    }

    Err(RuntimeError::ContainerNotFound(id_or_name.to_string()))
}
