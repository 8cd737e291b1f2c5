//! geoauth-core - Core library for the GeoGame account flow
//!
//! This crate contains the session model, the view-state reducer and
//! controller that drive the multi-screen auth flow, the Supabase Auth client
//! used as the identity provider, and the login callback notifier.

pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod notify;
pub mod provider;
pub mod session;
pub mod util;

pub use error::{Error, Result};
pub use flow::{AuthController, AuthState, Effect, FlowError, Notice, UserAction, View};
pub use provider::{IdentityProvider, ProviderEvent};
pub use session::Session;
