// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming line-oriented redaction for log files.
//!
//! Reuses `redact-core`'s discovery and redaction engines by lifting each
//! line into a single-field [`redact_core::RecordedEvent`]-free string
//! path (`PatternDiscoveryEngine::discover_line` /
//! `RedactionEngine::redact_string`), the same engines `redact-jfr` drives
//! off full events.

pub mod error;

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use redact_core::{Configuration, InteractiveOracle, PatternDiscoveryEngine, RedactionEngine};

pub use error::LineRedactError;

/// Counts collected during a redaction pass, surfaced to the CLI binary
/// for a summary log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineRedactStats {
    pub lines_read: u64,
    pub lines_written: u64,
}

/// Drives discovery and redaction over one text stream. Holds no state
/// across different input files.
pub struct LineRedactor {
    discovery: PatternDiscoveryEngine,
    redaction: RedactionEngine,
    cancel: Option<Arc<AtomicBool>>,
}

impl LineRedactor {
    pub fn new(config: &Configuration, redaction: RedactionEngine) -> Self {
        Self {
            discovery: PatternDiscoveryEngine::from_config(&config.discovery, &config.builtin_patterns),
            redaction,
            cancel: None,
        }
    }

    /// Attach a cooperative-cancellation flag, checked between lines.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(|f| !f.load(Ordering::SeqCst)).unwrap_or(false)
    }

    /// `TWO_PASS` discovery mode: learn values from the whole stream first,
    /// without writing anything, then seed the redaction engine. Call
    /// [`LineRedactor::redact`] against a fresh read of the same input
    /// afterward.
    pub fn discover<R: Read>(
        &mut self,
        input: R,
        oracle: Option<&mut dyn InteractiveOracle>,
    ) -> Result<(), LineRedactError> {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut line_number = 0u64;

        loop {
            if self.cancelled() {
                break;
            }
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            line_number += 1;
            let (content, _terminator) = split_terminator(&buf);
            let text = std::str::from_utf8(content)
                .map_err(|_| LineRedactError::InvalidUtf8 { line_number })?;
            self.discovery.discover_line(text);
        }

        let mut patterns = self.discovery.get_discovered_patterns();
        if let Some(oracle) = oracle {
            PatternDiscoveryEngine::apply_interactive_decisions(&mut patterns, oracle);
            oracle.save()?;
        }
        self.redaction.set_discovered(patterns);
        Ok(())
    }

    /// `NONE`/`TWO_PASS` redaction: apply the (possibly already-seeded)
    /// redaction engine to every line, writing the redacted text followed
    /// by the original line terminator, preserved bit-for-bit.
    pub fn redact<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<LineRedactStats, LineRedactError> {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut line_number = 0u64;
        let mut stats = LineRedactStats::default();

        loop {
            if self.cancelled() {
                break;
            }
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            line_number += 1;
            stats.lines_read += 1;

            let (content, terminator) = split_terminator(&buf);
            let text = std::str::from_utf8(content)
                .map_err(|_| LineRedactError::InvalidUtf8 { line_number })?;
            let redacted = self.redaction.redact_string(text);
            output.write_all(redacted.as_bytes())?;
            output.write_all(terminator)?;
            stats.lines_written += 1;
        }

        output.flush()?;
        Ok(stats)
    }

    /// `FAST` discovery mode: discover and redact in one pass over one
    /// stream. The redaction engine is reseeded after every line, so only
    /// occurrences after a value's first sighting benefit from it —
    /// matching the one-pass/two-pass trade-off described for this mode.
    pub fn process_single_pass<R: Read, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> Result<LineRedactStats, LineRedactError> {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut line_number = 0u64;
        let mut stats = LineRedactStats::default();

        loop {
            if self.cancelled() {
                break;
            }
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            line_number += 1;
            stats.lines_read += 1;

            let (content, terminator) = split_terminator(&buf);
            let text = std::str::from_utf8(content)
                .map_err(|_| LineRedactError::InvalidUtf8 { line_number })?;

            self.discovery.discover_line(text);
            self.redaction.set_discovered(self.discovery.get_discovered_patterns());

            let redacted = self.redaction.redact_string(text);
            output.write_all(redacted.as_bytes())?;
            output.write_all(terminator)?;
            stats.lines_written += 1;
        }

        output.flush()?;
        Ok(stats)
    }
}

/// Splits a `read_until(b'\n', ..)` buffer into its content and the exact
/// terminator bytes that followed it (`"\r\n"`, `"\n"`, or empty at EOF
/// with no trailing newline), so the terminator can be written back
/// unchanged.
fn split_terminator(buf: &[u8]) -> (&[u8], &[u8]) {
    if buf.ends_with(b"\r\n") {
        (&buf[..buf.len() - 2], &buf[buf.len() - 2..])
    } else if buf.ends_with(b"\n") {
        (&buf[..buf.len() - 1], &buf[buf.len() - 1..])
    } else {
        (buf, &buf[buf.len()..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redact_core::Pseudonymizer;
    use std::sync::Arc;

    fn engine() -> RedactionEngine {
        let config = Configuration::default();
        let pseudonymizer = Arc::new(Pseudonymizer::new(config.general.pseudonymization.clone()));
        RedactionEngine::from_config(&config, pseudonymizer)
    }

    #[test]
    fn split_terminator_handles_crlf_lf_and_eof_without_newline() {
        assert_eq!(split_terminator(b"abc\r\n"), (&b"abc"[..], &b"\r\n"[..]));
        assert_eq!(split_terminator(b"abc\n"), (&b"abc"[..], &b"\n"[..]));
        assert_eq!(split_terminator(b"abc"), (&b"abc"[..], &b""[..]));
    }

    #[test]
    fn redact_preserves_line_endings_bit_for_bit() {
        let config = Configuration::default();
        let redactor = LineRedactor::new(&config, engine());
        let input = b"connect to 10.0.0.5\r\nplain line\nlast line no newline".to_vec();
        let mut output = Vec::new();
        let stats = redactor.redact(&input[..], &mut output).unwrap();
        assert_eq!(stats.lines_read, 3);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.split_inclusive(|c| c == '\n').collect();
        assert!(lines[0].ends_with("\r\n"));
        assert!(lines[1].ends_with('\n') && !lines[1].ends_with("\r\n"));
        assert!(!lines[2].ends_with('\n'));
        assert!(!lines[0].contains("10.0.0.5"));
    }

    #[test]
    fn invalid_utf8_surfaces_as_line_numbered_error() {
        let config = Configuration::default();
        let redactor = LineRedactor::new(&config, engine());
        let input: Vec<u8> = vec![b'o', b'k', b'\n', 0xff, 0xfe, b'\n'];
        let mut output = Vec::new();
        let err = redactor.redact(&input[..], &mut output).unwrap_err();
        match err {
            LineRedactError::InvalidUtf8 { line_number } => assert_eq!(line_number, 2),
            other => panic!("expected InvalidUtf8, got {other:?}"),
        }
    }

    #[test]
    fn discover_then_redact_catches_repeated_value_on_first_occurrence() {
        let config = Configuration::default();
        let mut redactor = LineRedactor::new(&config, engine());
        let input = b"user alice logged in\nuser alice logged out\n".to_vec();

        redactor.discover(&input[..], None).unwrap();
        let mut output = Vec::new();
        redactor.redact(&input[..], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        // No built-in pattern matches a bare name; this only exercises the
        // pipeline shape (discover-then-redact yields well-formed output),
        // not a specific custom-pattern redaction.
        assert_eq!(text.lines().count(), 2);
    }
}
