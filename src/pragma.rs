//! Pragma directives and the validation-toggle map they drive.
use std::fmt;

use crate::error::{ErrorKind, Location, ParseError};

/// One of the five validation toggles a patch can flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pragma {
    /// Warn when a record has no old data on apply.
    WarnNoOldOnApply,
    /// Warn when the new data already exists on apply.
    WarnIfNewExistOnApply,
    /// Warn when the old data still exists on undo.
    WarnIfOldExistOnUndo,
    /// Allow the patch to be undone.
    Undo,
    /// Treat missing old data as a run of 0xFF bytes.
    OldEqualFf,
}

impl Pragma {
    /// Every known pragma, in declaration order.
    pub const ALL: [Pragma; 5] = [
        Pragma::WarnNoOldOnApply,
        Pragma::WarnIfNewExistOnApply,
        Pragma::WarnIfOldExistOnUndo,
        Pragma::Undo,
        Pragma::OldEqualFf,
    ];

    /// The name used in `#pragma` directives.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Pragma::WarnNoOldOnApply => "warn_no_old_on_apply",
            Pragma::WarnIfNewExistOnApply => "warn_if_new_exist_on_apply",
            Pragma::WarnIfOldExistOnUndo => "warn_if_old_exist_on_undo",
            Pragma::Undo => "undo",
            Pragma::OldEqualFf => "old_equal_ff",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Pragma {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a directive enables or disables its pragma.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PragmaAction {
    /// `#pragma enable ...`
    Enable,
    /// `#pragma disable ...`
    Disable,
}

impl fmt::Display for PragmaAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PragmaAction::Enable => "enable",
            PragmaAction::Disable => "disable",
        })
    }
}

/// A decoded `#pragma` directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PragmaDirective {
    /// Enable or disable.
    pub action: PragmaAction,
    /// Which toggle the directive targets.
    pub name: Pragma,
}

/// Decode a raw `PRAGMA` token.
///
/// The shape must be `#pragma (enable|disable) <known-name>`; anything else
/// is an invalid pragma.
pub(crate) fn decode_pragma(text: &str, loc: Location) -> Result<PragmaDirective, ParseError> {
    let invalid = || {
        ParseError::new(
            ErrorKind::InvalidPragma {
                text: text.to_owned(),
            },
            loc,
        )
    };

    let mut words = text.trim().split_whitespace();
    if words.next() != Some("#pragma") {
        return Err(invalid());
    }
    let action = match words.next() {
        Some("enable") => PragmaAction::Enable,
        Some("disable") => PragmaAction::Disable,
        _ => return Err(invalid()),
    };
    let name = words
        .next()
        .and_then(Pragma::from_name)
        .ok_or_else(invalid)?;
    if words.next().is_some() {
        return Err(invalid());
    }
    Ok(PragmaDirective { action, name })
}

/// The full set of validation toggles, with their current values.
///
/// A fresh copy is attached to every write record when it is emitted, so
/// consumers see the exact toggle state at that point of the patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Pragmas {
    /// Default: enabled.
    pub warn_no_old_on_apply: bool,
    /// Default: enabled.
    pub warn_if_new_exist_on_apply: bool,
    /// Default: enabled.
    pub warn_if_old_exist_on_undo: bool,
    /// Default: enabled.
    pub undo: bool,
    /// Default: disabled.
    pub old_equal_ff: bool,
}

impl Default for Pragmas {
    fn default() -> Self {
        Self {
            warn_no_old_on_apply: true,
            warn_if_new_exist_on_apply: true,
            warn_if_old_exist_on_undo: true,
            undo: true,
            old_equal_ff: false,
        }
    }
}

impl Pragmas {
    /// Current value of the given toggle.
    #[must_use]
    pub fn get(&self, pragma: Pragma) -> bool {
        match pragma {
            Pragma::WarnNoOldOnApply => self.warn_no_old_on_apply,
            Pragma::WarnIfNewExistOnApply => self.warn_if_new_exist_on_apply,
            Pragma::WarnIfOldExistOnUndo => self.warn_if_old_exist_on_undo,
            Pragma::Undo => self.undo,
            Pragma::OldEqualFf => self.old_equal_ff,
        }
    }

    pub(crate) fn set(&mut self, pragma: Pragma, value: bool) {
        match pragma {
            Pragma::WarnNoOldOnApply => self.warn_no_old_on_apply = value,
            Pragma::WarnIfNewExistOnApply => self.warn_if_new_exist_on_apply = value,
            Pragma::WarnIfOldExistOnUndo => self.warn_if_old_exist_on_undo = value,
            Pragma::Undo => self.undo = value,
            Pragma::OldEqualFf => self.old_equal_ff = value,
        }
    }
}
