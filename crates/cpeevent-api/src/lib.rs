pub mod account;
pub mod aggregator;
pub mod answers;
pub mod auth;
pub mod credentials;
pub mod error;
pub mod events;
pub mod extract;
pub mod membership;
pub mod middleware;
pub mod posts;
pub mod router;
pub mod rows;
pub mod state;

pub use router::app;
pub use state::{AppState, AppStateInner};
