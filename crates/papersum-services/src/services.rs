//! Service container for local state.

use std::path::PathBuf;

use crate::store::Result;
use crate::{LocalStore, SessionService, SettingsService};

pub struct Services {
    pub store: LocalStore,
    pub settings: SettingsService,
    pub session: SessionService,
}

impl Services {
    /// Open the local store and wire the services onto its connection
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let store = LocalStore::open(db_path)?;
        let settings = SettingsService::new(store.connection());
        let session = SessionService::new(settings.clone());

        Ok(Self {
            store,
            settings,
            session,
        })
    }
}
