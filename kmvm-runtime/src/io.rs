//! I/O handling
//!
//! `in` reads whitespace-separated decimal integers from the reader; `out`
//! (and a bare `pop`) writes one value per line to the writer.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use kmvm_spec::Word;
use tracing::warn;
use crate::error::Result;

#[derive(Debug)]
pub struct IOHandler<R, W> {
    reader: R,
    writer: W,
    pending: VecDeque<String>,
    outputs: Vec<Word>,
    record: bool,
}

impl<R: BufRead, W: Write> IOHandler<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        IOHandler {
            reader,
            writer,
            pending: VecDeque::new(),
            outputs: Vec::new(),
            record: true,
        }
    }

    /// Keep (or stop keeping) a copy of every printed value
    pub fn record_outputs(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Read the next integer
    ///
    /// Returns `Ok(None)` when the input is exhausted or the next token is
    /// not an integer; the bad token is consumed and a warning logged.
    /// Bytes that are not UTF-8 make their token unparsable.
    pub fn read_value(&mut self) -> Result<Option<Word>> {
        while self.pending.is_empty() {
            let mut line = Vec::new();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                warn!("input exhausted, nothing pushed");
                return Ok(None);
            }
            self.pending.extend(
                String::from_utf8_lossy(&line)
                    .split_whitespace()
                    .map(str::to_string),
            );
        }

        let Some(token) = self.pending.pop_front() else {
            return Ok(None);
        };
        match token.parse::<Word>() {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(token = %token, error = %err, "input is not an integer, nothing pushed");
                Ok(None)
            }
        }
    }

    /// Print a value on its own line, recording it unless turned off
    pub fn write_value(&mut self, value: Word) -> Result<()> {
        writeln!(self.writer, "{value}")?;
        if self.record {
            self.outputs.push(value);
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn outputs(&self) -> &[Word] {
        &self.outputs
    }

    pub fn take_outputs(&mut self) -> Vec<Word> {
        std::mem::take(&mut self.outputs)
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}
