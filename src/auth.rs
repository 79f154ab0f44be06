//! Bearer-credential management: the expiry-aware cache and the client-credentials acquirer.

pub mod credential;
pub mod token_client;

pub use credential::*;
pub use token_client::*;
