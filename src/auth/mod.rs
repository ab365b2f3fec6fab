// Authentication module
// Manages the ecobee token lifecycle and the token file

mod manager;
mod refresh;
pub mod store;
mod types;

pub use manager::CredentialManager;
pub use types::{CredentialState, GrantType, TokenPair};
