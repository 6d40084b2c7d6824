pub mod api;
pub mod poller;

pub use api::{login_failure_message, ApiClient, HealthResponse, LOGIN_FAILED};
pub use poller::{PollEvent, PollHandle, StatusPoller, StatusSource};
