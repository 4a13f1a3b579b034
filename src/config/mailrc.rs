//! Reader for mailx-style `mail.rc` files.
//!
//! Only `set key=value ...` lines matter here. Tokens follow POSIX shell
//! quoting rules, and anything after an unquoted `#` is a comment. Lines
//! are decoded lossily, so stray non-UTF-8 bytes never fail a read.

use std::collections::VecDeque;
use std::io::{BufRead, Split};
use std::path::PathBuf;

use crate::error::ConfigError;

const SET_COMMAND: &str = "set";

/// One `key=value` assignment found on a `set` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    /// 1-based line number in the source file.
    pub line: usize,
    pub key: String,
    pub value: String,
}

/// Iterator over the assignments of a `mail.rc` file, in file order.
///
/// Yields an error for unreadable input or unbalanced quotes; callers are
/// expected to stop at the first error.
pub struct Settings<R> {
    lines: Split<R>,
    path: PathBuf,
    line_no: usize,
    pending: VecDeque<Setting>,
}

impl<R: BufRead> Settings<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            lines: reader.split(b'\n'),
            path: path.into(),
            line_no: 0,
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> Iterator for Settings<R> {
    type Item = Result<Setting, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(setting) = self.pending.pop_front() {
                return Some(Ok(setting));
            }

            let line = match self.lines.next()? {
                Ok(bytes) => decode_line(&bytes),
                Err(source) => {
                    return Some(Err(ConfigError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            self.line_no += 1;

            let Some(tokens) = shlex::split(&line) else {
                return Some(Err(ConfigError::Syntax {
                    path: self.path.clone(),
                    line: self.line_no,
                }));
            };
            self.pending.extend(parse_set_line(&tokens, self.line_no));
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_set_line(tokens: &[String], line: usize) -> Vec<Setting> {
    match tokens {
        [command, assignments @ ..] if command == SET_COMMAND => assignments
            .iter()
            .filter_map(|token| token.split_once('='))
            .map(|(key, value)| Setting {
                line,
                key: key.trim().to_string(),
                value: strip_comment(value).trim().to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

// A quoted value can still carry a " #comment" tail.
fn strip_comment(value: &str) -> &str {
    value.split(" #").next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn settings(input: &str) -> Vec<(String, String)> {
        Settings::new(Cursor::new(input.to_string()), "test.rc")
            .map(|s| {
                let s = s.unwrap();
                (s.key, s.value)
            })
            .collect()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn reads_simple_set_lines() {
        let got = settings("set smtp=smtps://smtp.gmail.com:465\nset smtp-auth-user=hello\n");
        assert_eq!(
            got,
            vec![
                pair("smtp", "smtps://smtp.gmail.com:465"),
                pair("smtp-auth-user", "hello"),
            ]
        );
    }

    #[test]
    fn reads_multiple_quoted_assignments_on_one_line() {
        let got = settings(
            r#"set smtp=smtp://example.com/foo/bar smtp-auth-user="it's me" smtp-auth-password="secret""#,
        );
        assert_eq!(
            got,
            vec![
                pair("smtp", "smtp://example.com/foo/bar"),
                pair("smtp-auth-user", "it's me"),
                pair("smtp-auth-password", "secret"),
            ]
        );
    }

    #[test]
    fn skips_comments_and_other_commands() {
        let got = settings("# comment\nalias hoge fuga\nset\nset verbose\nset from=me<me@example.com>  # trailing\n");
        assert_eq!(got, vec![pair("from", "me<me@example.com>")]);
    }

    #[test]
    fn strips_comment_inside_quoted_value() {
        let got = settings(r#"set smtp-auth-user="alice #primary account""#);
        assert_eq!(got, vec![pair("smtp-auth-user", "alice")]);
    }

    #[test]
    fn reports_line_numbers() {
        let lines: Vec<usize> = Settings::new(Cursor::new("\n\nset a=1 b=2\n\nset c=3"), "x")
            .map(|s| s.unwrap().line)
            .collect();
        assert_eq!(lines, vec![3, 3, 5]);
    }

    #[test]
    fn tolerates_crlf_and_non_utf8_bytes() {
        let input = b"# caf\xe9\r\nset smtp-auth-user=alice\r\nset from=\"R\xe9my <r@example.com>\"\n";
        let got: Vec<(String, String)> = Settings::new(Cursor::new(&input[..]), "test.rc")
            .map(|s| {
                let s = s.unwrap();
                (s.key, s.value)
            })
            .collect();
        assert_eq!(
            got,
            vec![
                pair("smtp-auth-user", "alice"),
                pair("from", "R\u{fffd}my <r@example.com>"),
            ]
        );
    }

    #[test]
    fn unbalanced_quote_is_a_syntax_error() {
        let mut iter = Settings::new(Cursor::new("set a=1\nset from=\"broken\n"), "/etc/mail.rc");
        assert!(iter.next().unwrap().is_ok());
        match iter.next().unwrap() {
            Err(ConfigError::Syntax { path, line }) => {
                assert_eq!(path, PathBuf::from("/etc/mail.rc"));
                assert_eq!(line, 2);
            }
            other => panic!("Expected Syntax error, got {:?}", other),
        }
    }
}
