mod client;
mod error;
mod types;

pub use client::Client;
pub use client::EXECUTION_STATE_PATH;
pub use error::FetchError;
pub use error::FetchErrorKind;
pub use types::ExecutionStateResponse;
