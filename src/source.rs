//! Newline-delimited JSON [`EventSource`].
//!
//! Every line is one [`HostEvent`]:
//!
//! ```json
//! {"Resize":{"width":1280,"height":720}}
//! {"Scroll":{"y":120}}
//! {"Frame":{"time":0.016}}
//! ```
//!
//! Blank lines are skipped.  A malformed line is logged and skipped, unless
//! the source is [`strict`](JsonLinesSource::strict), in which case it ends
//! the run with [`SourceError::Json`].

use crate::event::HostEvent;
use crate::traits::EventSource;
use log::{debug, error, info};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc;

/// Errors produced while reading events.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub struct JsonLinesSource<R> {
    reader: R,
    strict: bool,
}

impl<R: BufRead + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            strict: false,
        }
    }

    /// Fail on the first malformed line instead of skipping it.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl JsonLinesSource<BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead + Send> EventSource for JsonLinesSource<R> {
    type Error = SourceError;

    /// Read until end of input or until the receiving side hangs up.
    fn run(&mut self, sink: mpsc::Sender<HostEvent>) -> Result<(), SourceError> {
        let mut forwarded = 0usize;
        let mut buf = String::new();
        let mut line = 0usize;
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                break;
            }
            line += 1;
            let text = buf.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<HostEvent>(text) {
                Ok(event) => {
                    if sink.send(event).is_err() {
                        info!("sink closed, stopping after {} events", forwarded);
                        return Ok(());
                    }
                    forwarded += 1;
                }
                Err(source) if self.strict => return Err(SourceError::Json { line, source }),
                Err(e) => error!("line {}: bad event {:?}: {}", line, text, e),
            }
        }
        debug!("end of input after {} lines, {} events", line, forwarded);
        Ok(())
    }
}
