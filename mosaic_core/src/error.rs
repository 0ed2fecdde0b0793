// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! POSIX-errno-flavored error type.
//!
//! Every fallible core operation returns [`Result<T>`] rather than a raw
//! negated errno, but the four kinds below are a direct, intentional mirror
//! of the error taxonomy a C host in this domain uses: allocation failure,
//! invalid settings input, missing names, and backend shutdown. Contract
//! violations that indicate a program bug (a tap name reused with a
//! mismatched type, destroying a context twice, submitting to a torn-down
//! pool) are modeled as panics/assertions instead of this type, since they
//! are not meant to be recovered from.

use crate::setup::{SettingDesc, SettingRef};

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A recoverable core error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Allocation failed. Callers must propagate; partial constructions
    /// unwind using each layer's own teardown.
    #[error("allocation failed")]
    NoMemory,

    /// A setting value failed validation, or a context path was malformed.
    ///
    /// Carries the offending setting and/or descriptor so an interactive
    /// frontend can highlight and re-prompt for exactly that value.
    #[error("invalid setting{}", .setting.as_ref().map(|s| format!(" {s:?}")).unwrap_or_default())]
    InvalidSetting {
        /// The offending setting, if one was already present.
        setting: Option<SettingRef>,
        /// The descriptor describing what was expected instead.
        desc: Option<SettingDesc>,
    },

    /// A named module, context path, or setting key was not found in its
    /// scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend signaled that the user closed the window or requested
    /// shutdown; the main loop should exit cleanly rather than treat this
    /// as failure.
    #[error("pipe closed")]
    Closed,
}

impl Error {
    /// Builds an [`Error::InvalidSetting`] carrying only a descriptor — used
    /// when a required setting is simply missing rather than malformed.
    #[must_use]
    pub fn missing(desc: SettingDesc) -> Self {
        Self::InvalidSetting {
            setting: None,
            desc: Some(desc),
        }
    }

    /// Builds an [`Error::InvalidSetting`] carrying both the offending
    /// setting and the descriptor it failed to satisfy.
    #[must_use]
    pub fn invalid(setting: SettingRef, desc: SettingDesc) -> Self {
        Self::InvalidSetting {
            setting: Some(setting),
            desc: Some(desc),
        }
    }
}

