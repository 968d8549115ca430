//! Token secrets and the per-user records persisted by the token store.

pub mod identity;
pub mod record;
pub mod secret;
