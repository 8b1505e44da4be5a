//! Request extractors for invoicing-service.

mod caller;

pub use caller::{CallerIdentity, DEFAULT_ROLE, USER_ID_HEADER, USER_ROLE_HEADER};
