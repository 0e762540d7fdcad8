//! One buffered log stream (points or camera)
//!
//! Text accumulates in `buffer`. A cooperative flush moves it into the
//! in-flight region and writes that out chunk by chunk; the synchronous
//! shutdown path writes whatever is left of both in one go.

use std::io::{self, Write};

/// Buffered text log backed by a writer
pub struct StreamLog {
    name: &'static str,
    sink: Option<Box<dyn Write>>,
    buffer: String,
    in_flight: Vec<u8>,
    /// Bytes of `in_flight` already written
    written: usize,
    bytes_written: u64,
}

impl StreamLog {
    pub fn new(name: &'static str, sink: Box<dyn Write>) -> Self {
        Self {
            name,
            sink: Some(sink),
            buffer: String::new(),
            in_flight: Vec::new(),
            written: 0,
            bytes_written: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Buffer for appending records
    pub fn buffer_mut(&mut self) -> &mut String {
        &mut self.buffer
    }

    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Buffered bytes not yet handed to a flush
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// True while a cooperative drain has bytes left to write
    pub fn is_draining(&self) -> bool {
        self.written < self.in_flight.len()
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Bytes successfully handed to the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Move the buffer into the in-flight region. Appends after this go to a fresh buffer.
    pub fn begin_drain(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        if self.is_draining() {
            self.in_flight.extend_from_slice(text.as_bytes());
        } else {
            self.in_flight = text.into_bytes();
            self.written = 0;
        }
    }

    /// Write up to `max_bytes` of the in-flight region.
    ///
    /// Returns `Ok(true)` once the region is fully written and the sink
    /// flushed. On error the unwritten remainder is discarded.
    pub fn write_chunk(&mut self, max_bytes: usize) -> io::Result<bool> {
        if self.sink.is_none() {
            self.clear_in_flight();
            return Ok(true);
        }
        if !self.is_draining() {
            return Ok(true);
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(true);
        };

        let end = (self.written + max_bytes.max(1)).min(self.in_flight.len());
        let result = sink.write_all(&self.in_flight[self.written..end]).and_then(|()| {
            if end == self.in_flight.len() {
                sink.flush()
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => {
                self.bytes_written += (end - self.written) as u64;
                self.written = end;
                let done = !self.is_draining();
                if done {
                    self.clear_in_flight();
                }
                Ok(done)
            }
            Err(e) => {
                self.clear_in_flight();
                Err(e)
            }
        }
    }

    fn clear_in_flight(&mut self) {
        self.in_flight.clear();
        self.written = 0;
    }

    /// Synchronously write the in-flight remainder then the buffer, flush and close.
    ///
    /// The stream is closed even when a write fails.
    pub fn finish(&mut self) -> io::Result<()> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };

        let remainder = self.in_flight.get(self.written..).unwrap_or_default();
        let buffered = std::mem::take(&mut self.buffer);
        let result = sink
            .write_all(remainder)
            .and_then(|()| sink.write_all(buffered.as_bytes()))
            .and_then(|()| sink.flush());

        if result.is_ok() {
            self.bytes_written += (remainder.len() + buffered.len()) as u64;
        }
        self.clear_in_flight();
        result
    }
}
