//! Semantic layer on top of the raw parser.
//!
//! Tracks pragma toggles and the offset corrector across the patch, checks
//! each record against the active toggles and assembles the final list of
//! write records.
use std::collections::HashMap;

use crate::error::{ErrorKind, Location, ParseError};
use crate::parser::{parse_raw, DataNode, OffsetNode, PragmaNode, VkpEvents};
use crate::pragma::{Pragma, PragmaAction, Pragmas};

/// Options controlling which patch shapes are accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Do not warn on records without old data.
    pub allow_empty_old_data: bool,
    /// Accept placeholder tokens in the new data of a record.
    pub allow_placeholders: bool,
}

/// One validated write operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Write {
    /// Target address, offset corrector applied.
    pub addr: u32,
    /// Number of bytes written, `new.len()`.
    pub size: usize,
    /// Expected current content, when the record (or `old_equal_ff`)
    /// provides it.
    pub old: Option<Vec<u8>>,
    /// Bytes to write.
    pub new: Vec<u8>,
    /// Location of the record's address token.
    pub loc: Location,
    /// Snapshot of the pragma toggles active at this record.
    pub pragmas: Pragmas,
}

/// The outcome of parsing a whole patch.
#[derive(Clone, Debug, Default)]
pub struct ParseResult {
    /// Validated write records, in patch order.
    pub writes: Vec<Write>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<ParseError>,
    /// Fatal diagnostics. Lines with errors produce no writes.
    pub errors: Vec<ParseError>,
    /// True when `errors` is empty.
    pub valid: bool,
}

/// Parse a patch and validate it into write records.
pub(crate) fn parse_patch(text: &str, options: ParseOptions) -> ParseResult {
    let mut semantics = Semantics {
        options,
        pragmas: Pragmas::default(),
        pragma_locs: HashMap::new(),
        offset: None,
        result: ParseResult::default(),
    };
    parse_raw(text, &mut semantics);
    semantics.finish()
}

/// The active offset corrector, kept for the end-of-patch check.
struct OffsetCorrector {
    value: i64,
    text: String,
    loc: Location,
}

struct Semantics {
    options: ParseOptions,
    pragmas: Pragmas,
    /// Where each toggle last changed value, for uncanceled-pragma warnings.
    pragma_locs: HashMap<Pragma, Location>,
    offset: Option<OffsetCorrector>,
    result: ParseResult,
}

impl Semantics {
    fn finish(mut self) -> ParseResult {
        let defaults = Pragmas::default();
        for pragma in Pragma::ALL {
            let enabled = self.pragmas.get(pragma);
            if enabled != defaults.get(pragma) {
                let loc = self
                    .pragma_locs
                    .get(&pragma)
                    .copied()
                    .unwrap_or_else(Location::start);
                self.result.warnings.push(ParseError::new(
                    ErrorKind::UncanceledPragma {
                        name: pragma,
                        enabled,
                    },
                    loc,
                ));
            }
        }
        if let Some(offset) = &self.offset {
            if offset.value != 0 {
                self.result.warnings.push(ParseError::new(
                    ErrorKind::UncanceledOffset {
                        text: offset.text.clone(),
                    },
                    offset.loc,
                ));
            }
        }
        self.result.valid = self.result.errors.is_empty();
        self.result
    }
}

impl VkpEvents for Semantics {
    fn on_pragma(&mut self, node: PragmaNode, loc: Location) {
        let PragmaNode { directive, .. } = node;
        let desired = directive.action == PragmaAction::Enable;
        if self.pragmas.get(directive.name) == desired {
            self.result.warnings.push(ParseError::new(
                ErrorKind::UselessPragma {
                    action: directive.action,
                    name: directive.name,
                },
                loc,
            ));
        } else {
            self.pragmas.set(directive.name, desired);
            let _ = self.pragma_locs.insert(directive.name, loc);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn on_patch_data(&mut self, node: DataNode, loc: Location) {
        let DataNode {
            address, old, new, ..
        } = node;

        // Placeholders only matter in the data actually written; wildcards
        // in old data merely relax the comparison.
        if new.placeholders > 0 && !self.options.allow_placeholders {
            self.result
                .errors
                .push(ParseError::new(ErrorKind::PlaceholderInData, new.loc));
        }

        let old_loc = old.as_ref().map(|data| data.loc);
        let mut old_bytes = old.map(|data| data.data);
        if self.pragmas.old_equal_ff && old_bytes.is_none() {
            old_bytes = Some(vec![0xFF; new.data.len()]);
        }

        if let Some(bytes) = &old_bytes {
            if bytes.len() < new.data.len() {
                self.result.errors.push(ParseError::new(
                    ErrorKind::OldDataTooShort {
                        old: bytes.len(),
                        new: new.data.len(),
                    },
                    old_loc.unwrap_or(new.loc),
                ));
            }
        }

        if self.pragmas.warn_no_old_on_apply
            && old_bytes.is_none()
            && !self.options.allow_empty_old_data
        {
            self.result
                .warnings
                .push(ParseError::new(ErrorKind::MissingOldData, new.loc));
        }

        let corrector = self.offset.as_ref().map_or(0, |offset| offset.value);
        // Wraps like 32-bit two's complement arithmetic.
        let addr = (corrector + i64::from(address)) as u32;
        self.result.writes.push(Write {
            addr,
            size: new.data.len(),
            old: old_bytes,
            new: new.data,
            loc,
            pragmas: self.pragmas,
        });
    }

    fn on_offset(&mut self, node: OffsetNode, loc: Location) {
        self.offset = Some(OffsetCorrector {
            value: node.offset,
            text: node.text,
            loc,
        });
    }

    fn on_warning(&mut self, warning: ParseError) {
        self.result.warnings.push(warning);
    }

    fn on_error(&mut self, error: ParseError, _resume: Location) {
        self.result.errors.push(error);
    }
}
