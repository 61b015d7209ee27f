pub mod client;
pub mod cookie;
pub mod error;
pub mod interactive;
pub mod manager;
pub mod session;
pub mod vault;

pub use client::AuthClient;
pub use cookie::Cookie;
pub use error::AuthError;
pub use manager::SessionManager;
pub use session::Session;
pub use vault::{CredentialVault, FileVault, VaultError};
