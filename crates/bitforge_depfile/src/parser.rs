//! Scanner for the single Make rule printed by `clang -M`.
//!
//! The grammar is `<stem>.o:` followed by whitespace-separated file names. A
//! backslash escapes the next byte (so `a\ b.h` is one name containing a space)
//! and a backslash directly followed by whitespace is a line continuation,
//! consumed as a separator.

use std::path::{Path, PathBuf};

use bitforge_common::HeaderSet;

use crate::error::DepfileError;

/// Maximum number of bytes of unexpected output quoted in an error.
const FOUND_EXCERPT_LEN: usize = 64;

/// Parses the dependency listing `output` generated for `source`.
///
/// Verifies the `<stem>.o:` rule target, then returns every listed file except
/// the source itself, in the order the compiler printed them. An empty
/// dependency list is valid and yields an empty [`HeaderSet`].
pub fn parse_dependencies(output: &str, source: &Path) -> Result<HeaderSet, DepfileError> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let prefix = format!("{stem}.o:");
    let source_str = source.to_string_lossy();

    let mut scanner = MakeRuleScanner::new(output);
    scanner.expect_prefix(&prefix).map_err(|found| {
        DepfileError::MalformedDependencyOutput {
            source_file: source.to_path_buf(),
            expected_prefix: prefix.clone(),
            found,
        }
    })?;

    let mut headers = HeaderSet::new();
    scanner.skip_separators();
    while !scanner.is_eof() {
        let name = scanner.read_file_name();
        if !name.is_empty() && name != source_str {
            headers.push(PathBuf::from(name));
        }
        scanner.skip_separators();
    }
    Ok(headers)
}

/// Byte cursor over a Make rule body.
///
/// Exposed for callers that need to scan rules with a target other than the
/// conventional `<stem>.o:`.
pub struct MakeRuleScanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> MakeRuleScanner<'a> {
    /// Creates a scanner positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn is_space(&self, pos: usize) -> bool {
        matches!(self.input.get(pos), Some(b' ' | b'\n' | b'\r' | b'\t'))
    }

    fn is_escape(&self, pos: usize) -> bool {
        self.input.get(pos) == Some(&b'\\')
    }

    /// Consumes `prefix` exactly.
    ///
    /// On mismatch the cursor does not move and the start of the remaining
    /// input is returned for error reporting.
    pub fn expect_prefix(&mut self, prefix: &str) -> Result<(), String> {
        let rest = &self.input[self.pos..];
        if rest.starts_with(prefix.as_bytes()) {
            self.pos += prefix.len();
            Ok(())
        } else {
            let end = rest.len().min(FOUND_EXCERPT_LEN);
            Err(String::from_utf8_lossy(&rest[..end]).into_owned())
        }
    }

    /// Skips whitespace and backslash-whitespace continuation markers.
    pub fn skip_separators(&mut self) {
        while !self.is_eof()
            && (self.is_space(self.pos) || (self.is_escape(self.pos) && self.is_space(self.pos + 1)))
        {
            self.pos += 1;
        }
    }

    /// Reads one file name up to the next unescaped whitespace.
    ///
    /// A backslash is dropped and the byte after it copied literally, whatever
    /// it is. A trailing backslash with nothing after it is kept as-is.
    pub fn read_file_name(&mut self) -> String {
        let mut name = Vec::new();
        while !self.is_eof() && !self.is_space(self.pos) {
            if self.is_escape(self.pos) {
                match self.input.get(self.pos + 1) {
                    Some(&next) => {
                        name.push(next);
                        self.pos += 2;
                    }
                    None => {
                        name.push(b'\\');
                        self.pos += 1;
                    }
                }
            } else {
                name.push(self.input[self.pos]);
                self.pos += 1;
            }
        }
        // Only ASCII bytes are ever dropped, so multi-byte sequences survive intact.
        String::from_utf8_lossy(&name).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &HeaderSet) -> Vec<String> {
        set.iter().map(|p| p.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn escaped_space_joins_name() {
        let headers = parse_dependencies("stem.o: a\\ b.h c.h", Path::new("/src/stem.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["a b.h", "c.h"]);
    }

    #[test]
    fn source_path_is_excluded() {
        let out = "Memory.o: /rt/src/Memory.cpp /rt/headers/Memory.h \\\n  /rt/headers/Alloc.h\n";
        let headers = parse_dependencies(out, Path::new("/rt/src/Memory.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/rt/headers/Memory.h", "/rt/headers/Alloc.h"]);
    }

    #[test]
    fn duplicates_other_than_source_pass_through() {
        let out = "a.o: /s/a.cpp /i/x.h /s/a.cpp /i/x.h";
        let headers = parse_dependencies(out, Path::new("/s/a.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/i/x.h", "/i/x.h"]);
    }

    #[test]
    fn continuation_lines_are_separators() {
        let out = "a.o: \\\n  /i/one.h \\\r\n  /i/two.h \\\n\t/i/three.h\n";
        let headers = parse_dependencies(out, Path::new("/s/a.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/i/one.h", "/i/two.h", "/i/three.h"]);
    }

    #[test]
    fn empty_after_prefix_is_valid() {
        let headers = parse_dependencies("a.o:", Path::new("/s/a.c")).unwrap();
        assert!(headers.is_empty());
        let headers = parse_dependencies("a.o: /s/a.c\n", Path::new("/s/a.c")).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn wrong_stem_is_malformed() {
        let err = parse_dependencies("b.o: /i/x.h", Path::new("/s/a.cpp")).unwrap_err();
        match err {
            DepfileError::MalformedDependencyOutput {
                source_file,
                expected_prefix,
                found,
            } => {
                assert_eq!(source_file, PathBuf::from("/s/a.cpp"));
                assert_eq!(expected_prefix, "a.o:");
                assert_eq!(found, "b.o: /i/x.h");
            }
        }
    }

    #[test]
    fn truncated_output_is_malformed() {
        assert!(parse_dependencies("a.", Path::new("/s/a.cpp")).is_err());
        assert!(parse_dependencies("", Path::new("/s/a.cpp")).is_err());
    }

    #[test]
    fn prefix_must_match_from_first_byte() {
        assert!(parse_dependencies(" a.o: /i/x.h", Path::new("/s/a.cpp")).is_err());
    }

    #[test]
    fn trailing_backslash_is_copied() {
        let headers = parse_dependencies("a.o: /i/dir\\", Path::new("/s/a.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/i/dir\\"]);
    }

    #[test]
    fn backslash_escapes_any_character() {
        // Permissive: unlike Make, any byte after a backslash is taken literally.
        let headers =
            parse_dependencies("a.o: C:\\\\inc\\\\x.h /i/\\#hash.h /i/\\$d.h", Path::new("/s/a.cpp"))
                .unwrap();
        assert_eq!(names(&headers), vec!["C:\\inc\\x.h", "/i/#hash.h", "/i/$d.h"]);
    }

    #[test]
    fn backslash_before_letter_is_dropped() {
        let headers = parse_dependencies("a.o: /i/\\q.h", Path::new("/s/a.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/i/q.h"]);
    }

    #[test]
    fn escaped_newline_inside_name_is_literal() {
        // A continuation marker only separates when it starts a token.
        let headers = parse_dependencies("a.o: /i/x\\\n.h", Path::new("/s/a.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/i/x\n.h"]);
    }

    #[test]
    fn non_ascii_names_survive() {
        let headers = parse_dependencies("a.o: /i/ünï\\ côdé.h", Path::new("/s/a.cpp")).unwrap();
        assert_eq!(names(&headers), vec!["/i/ünï côdé.h"]);
    }

    #[test]
    fn scanner_prefix_mismatch_leaves_cursor() {
        let mut scanner = MakeRuleScanner::new("x.o: y.h");
        assert_eq!(scanner.expect_prefix("z.o:"), Err("x.o: y.h".to_string()));
        assert!(scanner.expect_prefix("x.o:").is_ok());
        scanner.skip_separators();
        assert_eq!(scanner.read_file_name(), "y.h");
        assert!(scanner.is_eof());
    }
}
