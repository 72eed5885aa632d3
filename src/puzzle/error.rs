// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::{engine::EngineError, graph::PuzzleId};

#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("unknown puzzle {0:?}")]
    UnknownPuzzle(PuzzleId),

    #[error("puzzle {0:?} already exists")]
    DuplicatePuzzle(PuzzleId),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
