mod services;
mod session;
mod settings;
mod store;

pub use services::Services;
pub use session::SessionService;
pub use settings::SettingsService;
pub use store::{LocalStore, StoreError, ENV_DB_PATH};
