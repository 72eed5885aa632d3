// SPDX-License-Identifier: AGPL-3.0-or-later

use core::fmt;

use serde::{Deserialize, Serialize};

/// Fetch-state of an `Identity`'s document (§4.3's state machine).
///
/// `NotFetched -> Fetched` on successful parse, `NotFetched -> ParsingFailed`
/// on a failed parse (the edition is still consumed), `Fetched ->
/// NotFetched` on `mark_for_refetch` or on learning a strictly greater
/// edition.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    NotFetched,
    ParsingFailed,
    Fetched,
}
impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchState::NotFetched => "NotFetched",
            FetchState::ParsingFailed => "ParsingFailed",
            FetchState::Fetched => "Fetched",
        })
    }
}

/// Sign filter used by `get_identities_by_score`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSign {
    Positive,
    Zero,
    Negative,
}
impl ScoreSign {
    pub fn matches(self, value: i32) -> bool {
        match self {
            ScoreSign::Positive => value > 0,
            ScoreSign::Zero => value == 0,
            ScoreSign::Negative => value < 0,
        }
    }
}

/// Boolean enumeration with string serialization support, used by the
/// identity document codec for `PublishesTrustList`.
///
/// Represents yes/no values with support for various string representations
/// including "Yes"/"No", "true"/"false", and "1"/"0".
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    #[serde(
        rename = "Yes",
        alias = "yes",
        alias = "YES",
        alias = "true",
        alias = "True",
        alias = "1"
    )]
    Yes,
    #[serde(
        rename = "No",
        alias = "no",
        alias = "NO",
        alias = "false",
        alias = "False",
        alias = "0"
    )]
    No,
}
impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        })
    }
}
impl From<bool> for YesNo {
    fn from(b: bool) -> Self {
        if b { YesNo::Yes } else { YesNo::No }
    }
}
impl YesNo {
    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}
