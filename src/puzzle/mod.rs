// SPDX-License-Identifier: AGPL-3.0-or-later

//! Introduction puzzle subsystem (§4.7): an out-of-band Sybil-admission
//! channel layered on the engine and the shared object store.

pub mod client;
pub mod error;
pub mod server;
pub mod store;

pub use client::IntroductionClient;
pub use error::PuzzleError;
pub use server::{IntroductionNetwork, IntroductionServer};
pub use store::PuzzleStore;
