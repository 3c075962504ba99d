//! Authentication and authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after CORS and rate limiting):
//!     → provider.rs  IdentityProvider: headers → subject id
//!     → provider.rs  UserStore: subject id → UserRecord
//!     → principal.rs Principal (role, clinic)
//!     → gate.rs      role / clinic / ownership checks
//!     → middleware.rs inserts Principal, or error.rs renders 401/403/404/500
//! ```
//!
//! # Design Decisions
//! - Checks return `Result<_, AuthError>`; one translator maps kinds to status
//! - Super admins bypass role, tenant and ownership checks
//! - Collaborator failures and timeouts are 500s and are never echoed

pub mod error;
pub mod gate;
pub mod memory_store;
pub mod middleware;
pub mod principal;
pub mod provider;
pub mod session;

pub use error::{handle_auth_error, AuthError};
pub use gate::AuthGate;
pub use memory_store::MemoryUserStore;
pub use middleware::{auth_middleware, with_auth, AuthLayer};
pub use principal::{Principal, Role};
pub use provider::{CollaboratorError, IdentityProvider, UserRecord, UserStore};
pub use session::{SessionClaims, SessionTokenProvider};
