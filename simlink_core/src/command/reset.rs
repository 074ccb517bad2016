// simlink_core/src/command/reset.rs

//! Recursive-descent parser for RESET payloads.
//!
//! The payload is a run of flat brace-delimited objects, optionally wrapped
//! in a JSON array and followed by a `;`. Each object may carry `name`,
//! `position` and `rotation`; other keys are skipped.
//!
//! Recovery is local. A bad number drops the field that holds it. A syntax
//! error or a nested object drops the object it occurs in and parsing
//! resumes after that object's closing brace.

use crate::error::ParseIssue;
use crate::types::RobotResetInfo;

/// Parses every reset object in `payload`, collecting diagnostics.
pub fn parse_reset_payload(payload: &str) -> (Vec<RobotResetInfo>, Vec<ParseIssue>) {
    let mut parser = ResetParser::new(payload);
    parser.run();
    (parser.robots, parser.issues)
}

/// Fields collected for one object before it is accepted.
#[derive(Default)]
struct ObjectDraft {
    name: Option<String>,
    position: Option<Vec<f64>>,
    rotation: Option<Vec<f64>>,
    members: usize,
}

struct ResetParser<'a> {
    text: &'a str,
    pos: usize,
    object_start: usize,
    objects_seen: usize,
    robots: Vec<RobotResetInfo>,
    issues: Vec<ParseIssue>,
}

/// Bytes allowed between objects.
fn is_separator(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'[' | b']' | b',' | b';')
}

impl<'a> ResetParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            object_start: 0,
            objects_seen: 0,
            robots: Vec::new(),
            issues: Vec::new(),
        }
    }

    // --- Cursor primitives ---

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.text[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> ParseIssue {
        match self.text[self.pos..].chars().next() {
            Some(found) => ParseIssue::UnexpectedChar {
                offset: self.pos,
                found,
            },
            None => self.unterminated(),
        }
    }

    fn unterminated(&self) -> ParseIssue {
        ParseIssue::UnterminatedObject {
            offset: self.object_start,
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseIssue> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // --- Top level ---

    fn run(&mut self) {
        while let Some(byte) = self.peek() {
            if byte == b'{' {
                self.object_start = self.pos;
                let index = self.objects_seen;
                self.objects_seen += 1;

                match self.parse_object(index) {
                    Ok(Some(robot)) => self.robots.push(robot),
                    Ok(None) => {}
                    Err(issue) => {
                        self.issues.push(issue);
                        self.resync_past_object();
                    }
                }
            } else if is_separator(byte) {
                self.pos += 1;
            } else {
                self.issues.push(self.unexpected());
                self.skip_until_object();
            }
        }
    }

    fn skip_until_object(&mut self) {
        self.pos = self.text[self.pos..]
            .find('{')
            .map_or(self.text.len(), |offset| self.pos + offset);
    }

    /// Moves past the brace that closes the object at `object_start`,
    /// honouring nesting and quoted strings. Stops at the end of input.
    fn resync_past_object(&mut self) {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut index = self.object_start;

        while index < bytes.len() {
            let byte = bytes[index];
            index += 1;
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        self.pos = index;
    }

    // --- Objects ---

    /// Parses one object. `Ok(None)` means the object was consumed but
    /// produced no reset entry.
    fn parse_object(&mut self, index: usize) -> Result<Option<RobotResetInfo>, ParseIssue> {
        self.expect(b'{')?;
        let mut draft = ObjectDraft::default();

        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b'"') => {}
                Some(b'{') => return Err(ParseIssue::NestedObject { offset: self.pos }),
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.unterminated()),
            }

            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            self.parse_member(&key, &mut draft)?;
            draft.members += 1;

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b'{') => return Err(ParseIssue::NestedObject { offset: self.pos }),
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.unterminated()),
            }
        }

        if draft.members == 0 {
            return Ok(None);
        }
        match draft.name {
            Some(name) => Ok(Some(RobotResetInfo {
                name,
                position: draft.position.unwrap_or_default(),
                rotation: draft.rotation.unwrap_or_default(),
            })),
            None => {
                self.issues.push(ParseIssue::MissingName { index });
                Ok(None)
            }
        }
    }

    fn parse_member(&mut self, key: &str, draft: &mut ObjectDraft) -> Result<(), ParseIssue> {
        match key {
            "name" => {
                if self.peek() == Some(b'"') {
                    draft.name = Some(self.parse_string()?);
                } else {
                    self.issues.push(ParseIssue::ExpectedString);
                    self.skip_value()?;
                }
            }
            "position" => draft.position = self.parse_number_list(key)?,
            "rotation" => draft.rotation = self.parse_number_list(key)?,
            _ => self.skip_value()?,
        }
        Ok(())
    }

    // --- Values ---

    fn parse_string(&mut self) -> Result<String, ParseIssue> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            match self.next_char() {
                Some('"') => return Ok(out),
                Some('\\') => match self.next_char() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.parse_unicode_escape()?),
                    Some(c) => out.push(c),
                    None => return Err(self.unterminated()),
                },
                Some(c) => out.push(c),
                None => return Err(self.unterminated()),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, ParseIssue> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.unterminated())?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.unexpected())?;
        self.pos += 4;
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// Parses `[n, n, ...]`. A token that is not a finite number drops the
    /// whole field (returns `Ok(None)`) and records a diagnostic.
    fn parse_number_list(&mut self, field: &str) -> Result<Option<Vec<f64>>, ParseIssue> {
        if self.peek() != Some(b'[') {
            self.issues.push(ParseIssue::ExpectedArray {
                field: field.to_string(),
            });
            self.skip_value()?;
            return Ok(None);
        }
        self.pos += 1;

        let body_start = self.pos;
        let close = loop {
            match self.peek() {
                Some(b']') => break self.pos,
                Some(b'{') => return Err(ParseIssue::NestedObject { offset: self.pos }),
                Some(b'}') | Some(b'[') => return Err(self.unexpected()),
                Some(_) => self.pos += 1,
                None => return Err(self.unterminated()),
            }
        };
        self.pos += 1;

        let body = self.text[body_start..close].trim();
        if body.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let mut values = Vec::new();
        for token in body.split(',').map(str::trim) {
            match token.parse::<f64>() {
                Ok(value) if value.is_finite() => values.push(value),
                _ => {
                    self.issues.push(ParseIssue::InvalidNumber {
                        field: field.to_string(),
                        token: token.to_string(),
                    });
                    return Ok(None);
                }
            }
        }
        Ok(Some(values))
    }

    /// Skips a value whose key is not interesting.
    fn skip_value(&mut self) -> Result<(), ParseIssue> {
        match self.peek() {
            Some(b'"') => self.parse_string().map(drop),
            Some(b'{') => Err(ParseIssue::NestedObject { offset: self.pos }),
            Some(b'[') => {
                let mut depth = 0usize;
                loop {
                    match self.peek() {
                        Some(b'[') => depth += 1,
                        Some(b']') => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                return Ok(());
                            }
                        }
                        Some(b'"') => {
                            self.parse_string()?;
                            continue;
                        }
                        Some(b'{') => return Err(ParseIssue::NestedObject { offset: self.pos }),
                        Some(b'}') => return Err(self.unexpected()),
                        Some(_) => {}
                        None => return Err(self.unterminated()),
                    }
                    self.pos += 1;
                }
            }
            Some(_) => {
                while let Some(byte) = self.peek() {
                    if byte == b',' || byte == b'}' {
                        return Ok(());
                    }
                    if byte == b'{' {
                        return Err(ParseIssue::NestedObject { offset: self.pos });
                    }
                    self.pos += 1;
                }
                Err(self.unterminated())
            }
            None => Err(self.unterminated()),
        }
    }
}
