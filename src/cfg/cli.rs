// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// The two on-disk files `wot-node`'s startup needs before anything else
/// can run: the process `Config` and the `tracing` setup. Resolved
/// together so a launch from an arbitrary working directory fails with
/// both paths pinned down before `Config::load_from_file`/`init_logger`
/// ever touch the filesystem.
pub struct StartupPaths {
    pub node_config: PathBuf,
    pub logger_config: PathBuf,
}

/// Resolves `node_config_rel` and `logger_config_rel` to absolute,
/// canonical paths relative to the current working directory.
pub fn resolve_startup_paths(node_config_rel: &str, logger_config_rel: &str) -> Result<StartupPaths> {
    Ok(StartupPaths {
        node_config: resolve_one(node_config_rel)?,
        logger_config: resolve_one(logger_config_rel)?,
    })
}

fn resolve_one(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    abs.canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))
}
