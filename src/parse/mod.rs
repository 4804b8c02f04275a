//! Reading of the line-oriented input format shared by all engines. Input
//! may be gzip-compressed; the prolog line selects the engine.

mod stream;

pub use stream::StreamBuffer;

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use thiserror::Error;

use crate::basic_types::Literal;
use crate::engine::SatSolver;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("PARSE ERROR! Unexpected character {character:?} at byte {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("PARSE ERROR! Unexpected end of input at byte {position}")]
    UnexpectedEnd { position: usize },
    #[error("PARSE ERROR! {message} (at byte {position})")]
    Invalid { message: String, position: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The engine selector carried by the prolog line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramIdentifier {
    Cnf,
    Wcnf,
    Asp,
    Circumscription,
}

/// The parsed prolog line `p <id> …`.
#[derive(Clone, Copy, Debug)]
pub struct Prolog {
    pub identifier: ProgramIdentifier,
    pub num_variables: usize,
    pub num_clauses: usize,
    /// The hard-clause weight of `wcnf` instances.
    pub top: Option<i64>,
}

/// Open the input, transparently decoding gzip (detected by its magic
/// bytes). With no path, standard input is read.
pub fn open_reader(path: Option<&Path>) -> std::io::Result<Box<dyn BufRead>> {
    let raw: Box<dyn Read> = match path {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(std::io::stdin()),
    };
    let mut buffered = BufReader::new(raw);

    let is_gzip = {
        let head = buffered.fill_buf()?;
        head.len() >= 2 && head[0] == 0x1f && head[1] == 0x8b
    };

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(buffered))))
    } else {
        Ok(Box::new(buffered))
    }
}

/// Read comment lines and the prolog line; the stream is left at the first
/// byte of the program body.
pub fn read_prolog<R: BufRead>(stream: &mut StreamBuffer<R>) -> Result<Prolog, ParseError> {
    loop {
        stream.skip_whitespace()?;
        match stream.peek() {
            Some(b'c') => stream.skip_line()?,
            Some(b'p') => break,
            Some(byte) => {
                return Err(ParseError::UnexpectedCharacter {
                    character: byte as char,
                    position: stream.position(),
                })
            }
            None => {
                return Err(ParseError::UnexpectedEnd {
                    position: stream.position(),
                })
            }
        }
    }

    stream.expect_word("p")?;
    let word = stream.parse_word()?;
    let identifier = match word.as_str() {
        "cnf" => ProgramIdentifier::Cnf,
        "wcnf" => ProgramIdentifier::Wcnf,
        "asp" => ProgramIdentifier::Asp,
        "circ" => ProgramIdentifier::Circumscription,
        _ => {
            return Err(ParseError::Invalid {
                message: format!("unknown program identifier {word:?}"),
                position: stream.position(),
            })
        }
    };

    let mut prolog = Prolog {
        identifier,
        num_variables: 0,
        num_clauses: 0,
        top: None,
    };
    match identifier {
        ProgramIdentifier::Cnf | ProgramIdentifier::Wcnf => {
            prolog.num_variables = stream.parse_integer()?.max(0) as usize;
            prolog.num_clauses = stream.parse_integer()?.max(0) as usize;
            if identifier == ProgramIdentifier::Wcnf {
                stream.skip_whitespace_on_line()?;
                if !matches!(stream.peek(), None | Some(b'\n')) {
                    prolog.top = Some(stream.parse_integer()?);
                }
            }
            stream.skip_line()?;
        }
        ProgramIdentifier::Asp | ProgramIdentifier::Circumscription => {
            stream.skip_line()?;
        }
    }

    Ok(prolog)
}

/// Parse one DIMACS literal, creating its variable in the solver when
/// needed. `Ok(None)` is the terminating zero.
pub fn read_literal<R: BufRead>(
    stream: &mut StreamBuffer<R>,
    solver: &mut SatSolver,
) -> Result<Option<Literal>, ParseError> {
    let value = stream.parse_integer()?;
    if value == 0 {
        return Ok(None);
    }
    solver.grow_to_dimacs(value);
    Ok(Some(Literal::from_dimacs(value)))
}

/// Parse a zero-terminated clause.
pub fn read_clause<R: BufRead>(
    stream: &mut StreamBuffer<R>,
    solver: &mut SatSolver,
) -> Result<Vec<Literal>, ParseError> {
    let mut literals = Vec::new();
    while let Some(literal) = read_literal(stream, solver)? {
        literals.push(literal);
    }
    Ok(literals)
}
