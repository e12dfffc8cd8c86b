pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod policy;
pub mod public;
pub mod rate_limit;
pub mod routes;
pub mod seed;
pub mod sessions;
pub mod state;
pub mod validate;
pub mod views;
pub mod zone;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use seed::{SeedOptions, seed};
pub use state::{AppState, AppStateInner, Limits};
