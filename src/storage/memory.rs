use crate::error::{Error, Result};
use crate::state::{Application, Visibility};
use crate::storage::{check_insert, ApplicationStore};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local store; used by tests and by `serve --in-memory`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, Application>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("Application store lock poisoned".to_string())
}

impl ApplicationStore for MemoryStorage {
    fn insert(&self, app: Application) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        check_insert(&records, &app)?;
        records.insert(app.application_id.clone(), app);
        Ok(())
    }

    fn get(&self, application_id: &str) -> Result<Option<Application>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(application_id).cloned())
    }

    fn compare_and_swap(&self, expected_version: u64, next: &Application) -> Result<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(&next.application_id) {
            Some(current) if current.version == expected_version => {
                *current = next.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(Error::NotFound(next.application_id.clone())),
        }
    }

    fn scan(&self, visibility: &Visibility) -> Result<Vec<Application>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|app| visibility.matches(app))
            .cloned()
            .collect())
    }
}
