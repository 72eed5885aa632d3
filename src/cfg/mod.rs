// SPDX-License-Identifier: AGPL-3.0-or-later

//! This module handles configuration, command-line parsing, and logging.

/// Command-line interface parsing.
pub mod cli;
/// Configuration file parsing and management.
pub mod config;
/// Enumerations used in configuration and the graph model.
pub mod enums;
/// Logger initialization.
pub mod logger;
