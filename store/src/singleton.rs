//! Process-global manager accessor with double-checked-locking init/reconnect.
//!
//! Grounded on `original_source/tiny_chat/mcp/search_mcp.py`'s
//! `_qdrant_manager_instance` / `_qdrant_manager_lock` (a module-level
//! `threading.RLock()`-guarded singleton) — the closest analogue in the
//! corpus to a process-wide shared manager; the teacher's own crates are
//! used per-instance and have no equivalent to port from directly.

use std::sync::{Arc, Mutex, OnceLock};

use ragcore_core::error::Result;

use crate::config::StoreConfig;
use crate::manager::VectorStoreManager;

static INSTANCE: OnceLock<Mutex<Option<Arc<VectorStoreManager>>>> = OnceLock::new();
static ACTIVE_CONFIG: OnceLock<Mutex<Option<StoreConfig>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Arc<VectorStoreManager>>> {
    INSTANCE.get_or_init(|| Mutex::new(None))
}

fn active_config_slot() -> &'static Mutex<Option<StoreConfig>> {
    ACTIVE_CONFIG.get_or_init(|| Mutex::new(None))
}

/// Returns the process-wide manager, building or reconnecting it against
/// `config` as needed. Only the first call with a given process lifetime
/// that changes `config` tears down and rebuilds the manager; repeated calls
/// with an unchanged `config` return the existing instance cheaply.
///
/// # Errors
/// Returns whatever [`VectorStoreManager::new`] returns on (re)connect.
pub fn global(config: &StoreConfig) -> Result<Arc<VectorStoreManager>> {
    let mut guard = slot().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let mut active = active_config_slot()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let needs_rebuild = match (&*guard, &*active) {
        (Some(_), Some(current)) => current.is_need_reconnect(config),
        _ => true,
    };

    if needs_rebuild {
        let manager = Arc::new(VectorStoreManager::new(config.clone())?);
        *guard = Some(Arc::clone(&manager));
        *active = Some(config.clone());
        return Ok(manager);
    }

    Ok(Arc::clone(guard.as_ref().expect("checked above")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_calls_with_unchanged_config_share_one_instance() {
        let config = StoreConfig {
            file_path: Some(crate::config::MEMORY_PATH.to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        };
        let first = global(&config).unwrap();
        let second = global(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
