//! SNPs and short indels from one read's CIGAR and MD tag.
//!
//! The MD tag describes only the reference-consuming, tag-covered operations (M, =, X
//! and D). Walking the CIGAR, the parser feeds each aligned operation from the tag's match
//! runs and mismatch letters and expects every D operation to be described by a `^`
//! block of exactly its length. Insertions are read straight off the CIGAR. A read without
//! an MD tag yields its insertions only.
//!
//! The tag must line up with the CIGAR exactly. A tag that runs out early or has bases left
//! over is reported as a single [`EditTagError`], after which the parser yields nothing
//! more for that read.

use crate::reference::ReferenceReader;
use crate::sam::AlignedRead;
use crate::variation::{EvidenceMethod, Info, Variation, VariationKind};
use noodles::sam::alignment::record::cigar::op::Kind;
use thiserror::Error;

/// Why an MD tag does not describe the alignment it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditTagError {
    #[error("unexpected character '{character}' at offset {offset}")]
    InvalidCharacter { character: char, offset: usize },
    #[error("tag ends {missing} aligned bases early")]
    Deficit { missing: usize },
    #[error("tag describes {remaining} bases beyond the alignment")]
    Residual { remaining: usize },
    #[error("{run} matching bases are left when a {deletion}-base deletion begins")]
    UnconsumedRun { run: usize, deletion: usize },
    #[error("deletion of {expected} bases is described by {found} bases")]
    DeletionLength { expected: usize, found: usize },
    #[error("expected a deletion block for a {expected}-base deletion")]
    MissingDeletion { expected: usize },
    #[error("deletion block inside an aligned operation at reference position {pos}")]
    UnexpectedDeletion { pos: i64 },
}

/// One element of an MD tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Match(usize),
    Mismatch(u8),
    Deletion(&'a [u8]),
}

impl Token<'_> {
    /// Reference bases the token stands for.
    fn width(self) -> usize {
        match self {
            Token::Match(n) => n,
            Token::Mismatch(_) => 1,
            Token::Deletion(bases) => bases.len(),
        }
    }
}

/// Lexer over the raw bytes of an MD tag.
#[derive(Debug, Clone)]
struct Tokens<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Tokens<'a> {
    fn new(tag: &'a str) -> Self {
        Self { bytes: tag.as_bytes(), offset: 0 }
    }

    fn invalid(&self, at: usize) -> EditTagError {
        EditTagError::InvalidCharacter { character: char::from(self.bytes[at]), offset: at }
    }

    fn lex(&mut self) -> Option<Result<Token<'a>, EditTagError>> {
        let start = self.offset;
        let first = *self.bytes.get(start)?;
        let token = if first.is_ascii_digit() {
            let mut run: usize = 0;
            while let Some(b) = self.bytes.get(self.offset).copied().filter(u8::is_ascii_digit) {
                run = match run.checked_mul(10).and_then(|r| r.checked_add(usize::from(b - b'0'))) {
                    Some(r) => r,
                    None => return Some(Err(self.invalid(self.offset))),
                };
                self.offset += 1;
            }
            Token::Match(run)
        } else if first == b'^' {
            self.offset += 1;
            let from = self.offset;
            while self.bytes.get(self.offset).is_some_and(u8::is_ascii_alphabetic) {
                self.offset += 1;
            }
            if self.offset == from {
                return Some(Err(self.invalid(start)));
            }
            let bytes: &'a [u8] = self.bytes;
            Token::Deletion(&bytes[from..self.offset])
        } else if first.is_ascii_alphabetic() {
            self.offset += 1;
            Token::Mismatch(first.to_ascii_uppercase())
        } else {
            return Some(Err(self.invalid(start)));
        };
        Some(Ok(token))
    }
}

/// Iterator over the variations of one read.
pub struct EditTagParser<'a> {
    read: &'a AlignedRead,
    reference: &'a ReferenceReader,
    tokens: Option<Tokens<'a>>,
    op_index: usize,
    /// Bases of the current aligned operation not yet matched against the tag.
    op_remaining: usize,
    /// Matching bases of the current tag run not yet consumed.
    run: usize,
    ref_pos: i64,
    query_pos: usize,
    done: bool,
}

#[allow(clippy::cast_possible_wrap)]
fn as_i64(v: usize) -> i64 {
    v as i64
}

impl<'a> EditTagParser<'a> {
    #[must_use]
    pub fn new(read: &'a AlignedRead, reference: &'a ReferenceReader) -> Self {
        Self {
            read,
            reference,
            tokens: read.edit_tag.as_deref().map(Tokens::new),
            op_index: 0,
            op_remaining: 0,
            run: 0,
            ref_pos: read.pos,
            query_pos: 0,
            done: false,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, EditTagError> {
        match self.tokens.as_mut().and_then(Tokens::lex) {
            Some(Ok(token)) => Ok(Some(token)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// The next token that is not an empty match run.
    fn next_nonempty_token(&mut self) -> Result<Option<Token<'a>>, EditTagError> {
        loop {
            match self.next_token()? {
                Some(Token::Match(0)) => {}
                other => return Ok(other),
            }
        }
    }

    fn structural(&self, kind: VariationKind, start: i64, len: usize) -> Variation {
        Variation::structural(
            kind,
            self.read.reference,
            start,
            start + as_i64(len),
            self.reference.base_at(self.read.reference, start),
            EvidenceMethod::EditTag,
            Info::exact().svlen(as_i64(len)),
        )
    }

    /// Consumes tag bases for the current aligned operation, returning a SNP when a
    /// mismatch letter is reached.
    fn advance_aligned(&mut self) -> Result<Option<Variation>, EditTagError> {
        if self.run > 0 {
            let take = self.run.min(self.op_remaining);
            self.run -= take;
            self.op_remaining -= take;
            self.ref_pos += as_i64(take);
            self.query_pos += take;
            return Ok(None);
        }
        match self.next_token()? {
            Some(Token::Match(n)) => {
                self.run = n;
                Ok(None)
            }
            Some(Token::Mismatch(reference_base)) => {
                let read_base = self.read.sequence.get(self.query_pos).copied().unwrap_or(b'N');
                let snp = Variation::snp(self.read.reference, self.ref_pos, reference_base, read_base);
                self.op_remaining -= 1;
                self.ref_pos += 1;
                self.query_pos += 1;
                Ok(Some(snp))
            }
            Some(Token::Deletion(_)) => Err(EditTagError::UnexpectedDeletion { pos: self.ref_pos }),
            None => Err(EditTagError::Deficit { missing: self.op_remaining }),
        }
    }

    fn deletion(&mut self, len: usize) -> Result<Option<Variation>, EditTagError> {
        if self.tokens.is_none() {
            self.ref_pos += as_i64(len);
            return Ok(None);
        }
        if self.run > 0 {
            return Err(EditTagError::UnconsumedRun { run: self.run, deletion: len });
        }
        match self.next_nonempty_token()? {
            Some(Token::Deletion(bases)) if bases.len() == len => {
                let deletion = self.structural(VariationKind::Deletion, self.ref_pos - 1, len);
                self.ref_pos += as_i64(len);
                Ok(Some(deletion))
            }
            Some(Token::Deletion(bases)) => {
                Err(EditTagError::DeletionLength { expected: len, found: bases.len() })
            }
            _ => Err(EditTagError::MissingDeletion { expected: len }),
        }
    }

    /// Checks that nothing but empty runs follows the last operation.
    fn finish(&mut self) -> Result<(), EditTagError> {
        let mut remaining = self.run;
        while let Some(token) = self.next_token()? {
            remaining += token.width();
        }
        if remaining > 0 { Err(EditTagError::Residual { remaining }) } else { Ok(()) }
    }

    fn step(&mut self) -> Result<Option<Variation>, EditTagError> {
        loop {
            if self.op_remaining > 0 {
                if let Some(snp) = self.advance_aligned()? {
                    return Ok(Some(snp));
                }
                continue;
            }
            let Some(&(kind, len)) = self.read.cigar.get(self.op_index) else {
                self.finish()?;
                return Ok(None);
            };
            self.op_index += 1;
            match kind {
                Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => {
                    if self.tokens.is_some() {
                        self.op_remaining = len;
                    } else {
                        self.ref_pos += as_i64(len);
                        self.query_pos += len;
                    }
                }
                Kind::Deletion => {
                    if let Some(deletion) = self.deletion(len)? {
                        return Ok(Some(deletion));
                    }
                }
                Kind::Insertion => {
                    self.query_pos += len;
                    return Ok(Some(self.structural(VariationKind::Insertion, self.ref_pos - 1, len)));
                }
                Kind::SoftClip => self.query_pos += len,
                Kind::Skip => self.ref_pos += as_i64(len),
                Kind::HardClip | Kind::Pad => {}
            }
        }
    }
}

impl Iterator for EditTagParser<'_> {
    type Item = Result<Variation, EditTagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(variation)) => Some(Ok(variation)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
