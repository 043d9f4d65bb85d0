//! Coarse classification of a file's content before parsing.
//!
//! Patch collections mix real patches with RTF descriptions, placeholder
//! files pointing at an attached download, and plain notes. The classifier
//! lets tooling skip everything that is not an actual patch.

/// What a file's text looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// An RTF document.
    Rtf,
    /// A patch: at least one line starting with an address.
    Patch,
    /// A stub comment pointing at a file attached elsewhere.
    DownloadStub,
    /// Nothing but comments and whitespace.
    Empty,
    /// Anything else.
    Unknown,
}

/// Classify `text`.
///
/// Comments are stripped before looking for address lines, so a commented
/// out record does not make a file a patch.
#[must_use]
pub fn detect_content(text: &str) -> ContentKind {
    if text.contains("{\\rtf1") {
        return ContentKind::Rtf;
    }
    let stripped = strip_comments(text);
    if has_patch_line(&stripped) {
        return ContentKind::Patch;
    }
    // Stub markers live inside comments, look at the unstripped text.
    if has_download_stub(text) {
        return ContentKind::DownloadStub;
    }
    if stripped.trim().is_empty() {
        return ContentKind::Empty;
    }
    ContentKind::Unknown
}

/// Remove complete `/* */` blocks, then cut every line at its first line
/// comment marker.
fn strip_comments(text: &str) -> String {
    let mut without_blocks = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        match rest[start + 2..].find("*/") {
            Some(len) => {
                without_blocks.push_str(&rest[..start]);
                rest = &rest[start + 2 + len + 2..];
            }
            // An unterminated block is not a comment here.
            None => break,
        }
    }
    without_blocks.push_str(rest);

    let mut out = String::new();
    for (i, line) in without_blocks.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let cut = [line.find("//"), line.find(';'), line.find('#')]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(line.len());
        out.push_str(&line[..cut]);
    }
    out
}

/// A line starting with `<hex>:` followed by at least one character that is
/// neither `\` nor `/`, so Windows paths and URLs do not count.
fn has_patch_line(text: &str) -> bool {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .any(|start| is_patch_line(text[start..].as_bytes()))
}

fn is_patch_line(rest: &[u8]) -> bool {
    let mut i = 0;
    while rest.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    if (rest[i..].starts_with(b"0x") || rest[i..].starts_with(b"0X"))
        && rest.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
    {
        i += 2;
    }
    let digits_start = i;
    while rest.get(i).is_some_and(u8::is_ascii_hexdigit) {
        i += 1;
    }
    if i == digits_start {
        return false;
    }
    while rest.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    if rest.get(i) != Some(&b':') {
        return false;
    }
    matches!(rest.get(i + 1), Some(c) if *c != b'\\' && *c != b'/')
}

const STUB_MARKERS: [&str; 2] = [
    "к патчу прикреплён файл",
    "there is a file attached to this patch",
];

fn has_download_stub(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.match_indices(";!").any(|(i, _)| {
        let rest = &lowered[i + 2..];
        STUB_MARKERS.iter().any(|marker| {
            rest.strip_prefix(marker).is_some_and(|tail| {
                tail.starts_with(", http://") || tail.starts_with(", https://")
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch() {
        assert_eq!(detect_content("A0: 11 22\n"), ContentKind::Patch);
        assert_eq!(detect_content("  0x1F: 33\n"), ContentKind::Patch);
        assert_eq!(detect_content("notes\nA8123456: AA BB\n"), ContentKind::Patch);
        // Whitespace may separate the address from the colon.
        assert_eq!(detect_content("A0 : 11\n"), ContentKind::Patch);
    }

    #[test]
    fn test_not_a_patch() {
        // Windows paths and URLs are not addresses.
        assert_eq!(detect_content("C:\\windows"), ContentKind::Unknown);
        assert_eq!(detect_content("see https://example.org"), ContentKind::Unknown);
        // Nothing at all after the colon.
        assert_eq!(detect_content("A0:"), ContentKind::Unknown);
        assert_eq!(detect_content("hello world"), ContentKind::Unknown);
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(detect_content("// A0: 11 22\n"), ContentKind::Empty);
        assert_eq!(detect_content("; A0: 11 22\n"), ContentKind::Empty);
        assert_eq!(detect_content("/* A0: 11 22 */"), ContentKind::Empty);
        // The address survives the block comment around it.
        assert_eq!(
            detect_content("/* note */ A0: 11 22\n"),
            ContentKind::Patch
        );
    }

    #[test]
    fn test_rtf() {
        assert_eq!(
            detect_content("{\\rtf1\\ansi A0: 11 22}"),
            ContentKind::Rtf
        );
    }

    #[test]
    fn test_download_stub() {
        assert_eq!(
            detect_content(";!There is a file attached to this patch, https://example.org/p.vkp\n"),
            ContentKind::DownloadStub
        );
        assert_eq!(
            detect_content(";!К патчу прикреплён файл, http://example.org/p.vkp\n"),
            ContentKind::DownloadStub
        );
        // The marker must follow `;!` exactly.
        assert_eq!(
            detect_content("; There is a file attached to this patch, https://x\n"),
            ContentKind::Empty
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(detect_content(""), ContentKind::Empty);
        assert_eq!(detect_content("  \n\t\n"), ContentKind::Empty);
        assert_eq!(detect_content("// just notes\n; more\n"), ContentKind::Empty);
    }
}
