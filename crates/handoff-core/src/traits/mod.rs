// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator boundaries of the Handoff service.
//!
//! Every external collaborator (store, directory, delivery, text generation)
//! extends the [`PluginAdapter`] base trait and uses `#[async_trait]` for
//! dynamic dispatch compatibility.

pub mod adapter;
pub mod clock;
pub mod directory;
pub mod generator;
pub mod notifier;
pub mod storage;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use directory::ProfessionalDirectory;
pub use generator::TextGenerator;
pub use notifier::Notifier;
pub use storage::SessionStore;
