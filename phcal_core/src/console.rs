//! Channel-backed operator console.
//!
//! A reader thread owns the input stream and forwards trimmed lines through
//! a bounded channel, so the control loop can poll for commands without
//! blocking. The thread is detached: it ends by itself at end of input, and
//! a blocked `read_line` cannot be interrupted from this side anyway.

use crossbeam_channel as xch;
use std::io::{BufRead, Write};
use std::thread;

use phcal_traits::Console;

/// Input stream reached end of file (or the reader thread failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("console input closed")]
pub struct ConsoleClosed;

const LINE_QUEUE: usize = 64;

pub struct ChannelConsole<W: Write> {
    rx: xch::Receiver<String>,
    out: W,
}

impl<W: Write> ChannelConsole<W> {
    pub fn spawn<R: BufRead + Send + 'static>(mut reader: R, out: W) -> Self {
        let (tx, rx) = xch::bounded(LINE_QUEUE);
        thread::spawn(move || {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            tracing::debug!("console consumer gone, reader exiting");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "console read failed");
                        break;
                    }
                }
            }
            tracing::trace!("console reader exiting");
        });
        Self { rx, out }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Console for ChannelConsole<W> {
    fn try_read_line(
        &mut self,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        loop {
            match self.rx.try_recv() {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => return Ok(Some(line)),
                Err(xch::TryRecvError::Empty) => return Ok(None),
                Err(xch::TryRecvError::Disconnected) => return Err(Box::new(ConsoleClosed)),
            }
        }
    }

    fn write_line(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}
