//! Parser for VKP patch descriptions.
//!
//! VKP is a line-oriented format describing byte-level firmware patches:
//! each record names an address, optionally the bytes expected there, and
//! the bytes to write. Directive lines (`#pragma`, offset correctors) tune
//! how records are validated.
//!
//! The main entrypoint is [`parse`], which turns a whole patch into
//! validated write records plus warnings and errors. It never fails
//! outright: a line that does not parse is reported and skipped, so a
//! single typo cannot hide the rest of the patch.
//!
//! ```rust
//! use vkp_parser::parse;
//! use vkp_parser::patch::ParseOptions;
//!
//! let result = parse(
//!     "; Example patch
//! #pragma enable old_equal_ff
//! +0x10
//! A0060308: 0xFFFF 0x1234 ; set jump target
//! #pragma disable old_equal_ff
//! +0
//! ",
//!     ParseOptions::default(),
//! );
//!
//! assert!(result.valid);
//! assert!(result.warnings.is_empty());
//! assert_eq!(result.writes.len(), 1);
//!
//! let write = &result.writes[0];
//! assert_eq!(write.addr, 0xA006_0318);
//! assert_eq!(write.old.as_deref(), Some(&[0xFF, 0xFF][..]));
//! assert_eq!(write.new, [0x34, 0x12]);
//! ```
//!
//! The lower-level pieces are exposed as well: [`parser::parse_raw`] streams
//! parse events without any semantic checks, and [`content::detect_content`]
//! classifies a file before parsing it.

// Deny most of allowed by default lints from rustc.
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_docs)]
#![deny(non_ascii_idents)]
#![deny(noop_method_call)]
#![deny(rust_2021_compatibility)]
#![deny(single_use_lifetimes)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
#![deny(unused_lifetimes)]
#![deny(unused_qualifications)]
#![deny(unused_results)]
// Do the same for clippy
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
// Allow some useless pedantic lints
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::single_match_else)]
#![deny(clippy::cargo)]

pub mod content;
pub mod error;
mod lexer;
mod number;
pub mod parser;
pub mod patch;
pub mod pragma;
mod string;

/// Parse a patch description into validated write records.
///
/// Diagnostics are collected in the returned [`patch::ParseResult`];
/// `valid` is true when no errors were found.
#[must_use]
pub fn parse(text: &str, options: patch::ParseOptions) -> patch::ParseResult {
    patch::parse_patch(text, options)
}

#[cfg(test)]
mod test_helpers;
