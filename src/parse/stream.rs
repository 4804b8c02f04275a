use std::io::BufRead;

use super::ParseError;

/// A byte-stream cursor with one byte of lookahead, tracking the absolute
/// position for diagnostics.
#[derive(Debug)]
pub struct StreamBuffer<R> {
    reader: R,
    current: Option<u8>,
    position: usize,
}

impl<R: BufRead> StreamBuffer<R> {
    pub fn new(reader: R) -> Result<StreamBuffer<R>, ParseError> {
        let mut stream = StreamBuffer {
            reader,
            current: None,
            position: 0,
        };
        stream.bump()?;
        Ok(stream)
    }

    fn bump(&mut self) -> Result<(), ParseError> {
        let mut byte = [0u8; 1];
        let read = self.reader.read(&mut byte)?;
        self.current = if read == 0 { None } else { Some(byte[0]) };
        Ok(())
    }

    /// The byte under the cursor; `None` at end of input.
    pub fn peek(&self) -> Option<u8> {
        self.current
    }

    pub fn advance(&mut self) -> Result<(), ParseError> {
        if self.current.is_some() {
            self.position += 1;
            self.bump()?;
        }
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn skip_whitespace(&mut self) -> Result<(), ParseError> {
        while matches!(self.current, Some(byte) if byte.is_ascii_whitespace()) {
            self.advance()?;
        }
        Ok(())
    }

    /// Skip blanks without crossing into the next line.
    pub fn skip_whitespace_on_line(&mut self) -> Result<(), ParseError> {
        while matches!(self.current, Some(b' ' | b'\t' | b'\r')) {
            self.advance()?;
        }
        Ok(())
    }

    pub fn skip_line(&mut self) -> Result<(), ParseError> {
        while !matches!(self.current, None | Some(b'\n')) {
            self.advance()?;
        }
        self.advance()
    }

    /// The rest of the current line, without the terminating newline.
    pub fn read_line(&mut self) -> Result<String, ParseError> {
        let mut line = Vec::new();
        while let Some(byte) = self.current {
            if byte == b'\n' {
                break;
            }
            line.push(byte);
            self.advance()?;
        }
        self.advance()?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Parse a possibly signed integer, skipping leading whitespace.
    pub fn parse_integer(&mut self) -> Result<i64, ParseError> {
        self.skip_whitespace()?;

        let negative = match self.current {
            Some(b'-') => {
                self.advance()?;
                true
            }
            Some(b'+') => {
                self.advance()?;
                false
            }
            _ => false,
        };

        match self.current {
            Some(byte) if byte.is_ascii_digit() => {}
            Some(byte) => {
                return Err(ParseError::UnexpectedCharacter {
                    character: byte as char,
                    position: self.position,
                })
            }
            None => {
                return Err(ParseError::UnexpectedEnd {
                    position: self.position,
                })
            }
        }

        let mut value: i64 = 0;
        while let Some(byte) = self.current {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value * 10 + i64::from(byte - b'0');
            self.advance()?;
        }

        Ok(if negative { -value } else { value })
    }

    /// Consume exactly the given word.
    pub fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        for expected in word.bytes() {
            match self.current {
                Some(byte) if byte == expected => self.advance()?,
                Some(byte) => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: byte as char,
                        position: self.position,
                    })
                }
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        position: self.position,
                    })
                }
            }
        }
        Ok(())
    }

    /// The next whitespace-delimited word.
    pub fn parse_word(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace()?;
        let mut word = Vec::new();
        while let Some(byte) = self.current {
            if byte.is_ascii_whitespace() {
                break;
            }
            word.push(byte);
            self.advance()?;
        }
        if word.is_empty() {
            return Err(ParseError::UnexpectedEnd {
                position: self.position,
            });
        }
        Ok(String::from_utf8_lossy(&word).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(input: &str) -> StreamBuffer<&[u8]> {
        StreamBuffer::new(input.as_bytes()).unwrap()
    }

    #[test]
    fn integers_with_signs_and_whitespace() {
        let mut s = stream("  12 -3\n+4");
        assert_eq!(s.parse_integer().unwrap(), 12);
        assert_eq!(s.parse_integer().unwrap(), -3);
        assert_eq!(s.parse_integer().unwrap(), 4);
        assert!(s.parse_integer().is_err());
    }

    #[test]
    fn diagnostics_carry_the_position() {
        let mut s = stream("abc");
        let error = s.parse_integer().unwrap_err();
        match error {
            ParseError::UnexpectedCharacter {
                character,
                position,
            } => {
                assert_eq!(character, 'a');
                assert_eq!(position, 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lines_and_words() {
        let mut s = stream("p cnf 2 2\nrest of line");
        s.expect_word("p").unwrap();
        assert_eq!(s.parse_word().unwrap(), "cnf");
        assert_eq!(s.parse_integer().unwrap(), 2);
        assert_eq!(s.parse_integer().unwrap(), 2);
        s.skip_line().unwrap();
        assert_eq!(s.read_line().unwrap(), "rest of line");
        assert!(s.is_at_end());
    }
}
