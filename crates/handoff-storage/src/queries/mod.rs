// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the storage entities.

pub mod events;
pub mod messages;
pub mod professionals;
pub mod rules;
pub mod sessions;
