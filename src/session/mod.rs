pub mod identity;
pub mod storage;
pub mod store;
pub mod token;

pub use identity::{Identity, TenantRef};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use store::{IdentitySource, RestoreOutcome, Session, SessionEvent, SessionStore};
pub use token::TokenClaims;
