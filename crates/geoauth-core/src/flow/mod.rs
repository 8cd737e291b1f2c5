//! View-state controller for the multi-screen auth flow.
//!
//! [`AuthState`] is a synchronous reducer: every local action, provider
//! event and provider-call completion goes through [`AuthState::reduce`],
//! which returns the [`Effect`]s to perform. [`AuthController`] owns the
//! injected provider and notifier and performs those effects.

mod controller;
mod error;
mod form;
mod notice;
mod state;
mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{AuthController, Output};
pub use error::{FlowError, ValidationError};
pub use form::{Field, FormBuffer};
pub use notice::{messages, Notice, NoticeLevel};
pub use state::{AuthState, Completion, Effect, Message, ProviderCall, UserAction};
pub use view::{Operation, View};
