pub mod auth;
pub mod compose;
pub mod convert;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod profile;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use routes::router;
pub use state::{AppState, AppStateInner};
