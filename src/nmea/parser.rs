use super::{
    sentences::{Sentence, SentenceKind},
    FieldError, NmeaChecksum, NmeaError, NmeaToken, SentenceId, ID_CAPACITY, SENTENCE_LIMIT,
};

// States are named for the portion of the sentence *being received*
#[derive(Default, Copy, Clone)]
enum ParserState {
    #[default]
    AwaitStart,
    InType {
        checksum: NmeaChecksum,
    },
    InField {
        id: SentenceId,
        sentence: Sentence,
        field: u8,
        checksum: NmeaChecksum,
        rejected: Option<(u8, FieldError)>,
    },
    InChecksum {
        id: SentenceId,
        sentence: Sentence,
        expect: NmeaChecksum,
        rejected: Option<(u8, FieldError)>,
        first: Option<u8>,
    },
}
use ParserState::*;

impl ParserState {
    fn id(&self) -> Option<SentenceId> {
        match *self {
            AwaitStart | InType { .. } => None,
            InField { id, .. } | InChecksum { id, .. } => Some(id),
        }
    }
}

/// A sentence whose checksum matched and whose fields all interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed {
    pub id: SentenceId,
    pub sentence: Sentence,
}

/// Checksum-verified sentence, field errors not yet surfaced.
struct Frame {
    id: SentenceId,
    sentence: Sentence,
    rejected: Option<(u8, FieldError)>,
}

/// Byte-at-a-time NMEA-0183 decoder.
///
/// Fields are interpreted as they arrive into a staged [`Sentence`], which is
/// only handed out once the trailing checksum has matched. Nothing outside the
/// parser is touched while a sentence is in flight.
pub struct NmeaParser {
    state: ParserState,
    buf: NmeaToken,
    len: usize,
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaParser {
    pub fn new() -> Self {
        Self {
            state: AwaitStart,
            buf: NmeaToken::new(),
            len: 0,
        }
    }

    /// Drops any partial sentence. Always safe to call.
    pub fn reset(&mut self) {
        self.state = AwaitStart;
        self.buf.clear();
        self.len = 0;
    }

    /// True when no sentence is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, AwaitStart)
    }

    fn feed(&mut self, b: u8) -> Option<Result<Frame, NmeaError>> {
        if b == b'$' {
            if !self.is_idle() {
                log_debug!("start delimiter inside a sentence, restarting");
            }
            self.buf.clear();
            self.len = 1;
            self.state = InType {
                checksum: NmeaChecksum::new(),
            };
            return None;
        }
        if self.is_idle() {
            return None;
        }

        self.len += 1;
        if !(0x20..=0x7e).contains(&b) {
            log_debug!("non-printable byte {} inside a sentence", b);
            self.reset();
            return None;
        }
        if self.len > SENTENCE_LIMIT {
            let id = self.state.id();
            log_warn!("sentence longer than {} bytes", SENTENCE_LIMIT);
            self.reset();
            return Some(Err(NmeaError::TooLarge(id)));
        }

        match core::mem::take(&mut self.state) {
            AwaitStart => None,
            InType { checksum } => match b {
                b',' | b'*' => {
                    let Some(id) = SentenceId::from_bytes(&self.buf) else {
                        return Some(Err(NmeaError::TooLarge(None)));
                    };
                    let sentence = match SentenceKind::lookup(&self.buf) {
                        Some((_, kind)) => kind.stage(),
                        None => {
                            log_trace!("unsupported sentence {}", id.as_str());
                            Sentence::Unsupported
                        }
                    };
                    self.buf.clear();
                    self.state = if b == b',' {
                        InField {
                            id,
                            sentence,
                            field: 1,
                            checksum: checksum.next(b),
                            rejected: None,
                        }
                    } else {
                        InChecksum {
                            id,
                            sentence,
                            expect: checksum,
                            rejected: None,
                            first: None,
                        }
                    };
                    None
                }
                _ => {
                    if self.buf.len() == ID_CAPACITY || !self.buf.push(b) {
                        log_debug!("sentence type longer than {} bytes", ID_CAPACITY);
                        return Some(Err(NmeaError::TooLarge(None)));
                    }
                    self.state = InType {
                        checksum: checksum.next(b),
                    };
                    None
                }
            },
            InField {
                id,
                mut sentence,
                field,
                checksum,
                mut rejected,
            } => match b {
                b',' | b'*' => {
                    if rejected.is_none() {
                        if let Err(kind) = deliver(&self.buf, &mut sentence, field) {
                            log_debug!("{} field {}: rejected", id.as_str(), field);
                            rejected = Some((field, kind));
                        }
                    }
                    self.buf.clear();
                    self.state = if b == b',' {
                        InField {
                            id,
                            sentence,
                            field: field.saturating_add(1),
                            checksum: checksum.next(b),
                            rejected,
                        }
                    } else {
                        InChecksum {
                            id,
                            sentence,
                            expect: checksum,
                            rejected,
                            first: None,
                        }
                    };
                    None
                }
                _ => {
                    if !self.buf.push(b) {
                        log_warn!("{} field {} overflowed token buffer", id.as_str(), field);
                        return Some(Err(NmeaError::TooLarge(Some(id))));
                    }
                    self.state = InField {
                        id,
                        sentence,
                        field,
                        checksum: checksum.next(b),
                        rejected,
                    };
                    None
                }
            },
            InChecksum {
                id,
                sentence,
                expect,
                rejected,
                first,
            } => match first {
                None => {
                    self.state = InChecksum {
                        id,
                        sentence,
                        expect,
                        rejected,
                        first: Some(b),
                    };
                    None
                }
                Some(hi) => {
                    // state was left at AwaitStart by the take above
                    let Some(saw) = NmeaChecksum::from_hex(hi, b) else {
                        return Some(Err(NmeaError::MalformedChecksum(id)));
                    };
                    if expect != saw {
                        return Some(Err(NmeaError::BadChecksum {
                            id,
                            expect: expect.0,
                            saw,
                        }));
                    }
                    Some(Ok(Frame {
                        id,
                        sentence,
                        rejected: rejected.or_else(|| sentence.finish().err()),
                    }))
                }
            },
        }
    }

    /// Feeds one byte. Returns `Some` once per finished sentence, whether it
    /// was accepted or not; stray bytes between sentences yield `None`.
    pub fn process_byte(&mut self, b: u8) -> Option<Result<Parsed, NmeaError>> {
        self.feed(b).map(|r| {
            r.and_then(|frame| match frame {
                Frame {
                    id,
                    rejected: Some((field, kind)),
                    ..
                } => Err(NmeaError::BadField { id, field, kind }),
                Frame {
                    id,
                    sentence: Sentence::Unsupported,
                    ..
                } => Err(NmeaError::Unsupported(id)),
                Frame { id, sentence, .. } => Ok(Parsed { id, sentence }),
            })
        })
    }
}

fn deliver(buf: &NmeaToken, sentence: &mut Sentence, field: u8) -> Result<(), FieldError> {
    let token = buf.as_str().ok_or(FieldError::Number)?;
    sentence.field(field, token)
}
