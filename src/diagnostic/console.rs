use std::{
    io::{BufRead, BufReader, Stderr, Stdin, Write},
    sync::{Mutex, PoisonError},
};

use super::{DiagnosticSink, Inspection};
use crate::{Error, Result};

const HELP: &str = "commands: c(ontinue), a(rgs), bt (backtrace), q(uit), h(elp)";

/// Interactive breakpoint on a line-oriented console.
///
/// Stops the calling thread, prints the intercepted call and waits for
/// commands:
///
/// - `c`, an empty line or end of input: continue
/// - `a`: print positional and keyword arguments
/// - `bt`: print the failure backtrace (post-mortem only)
/// - `q`: quit, which fails the intercepted call with [`Error::SessionAborted`]
pub struct ConsoleBreakpoint<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsoleBreakpoint<BufReader<Stdin>, Stderr> {
    /// Prompt on stderr and read commands from stdin.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead + Send, W: Write + Send> ConsoleBreakpoint<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self, inspection: &Inspection<'_>, reader: &mut R, out: &mut W) -> Result<()> {
        let record = inspection.record();
        writeln!(out, "tripwire: {} at {}", inspection.kind(), record)?;
        if let Some(failure) = inspection.failure() {
            writeln!(out, "  {failure}")?;
            if let Some(location) = failure.location() {
                writeln!(out, "  at {location}")?;
            }
        }

        let mut line = String::new();
        loop {
            write!(out, "(tripwire) ")?;
            out.flush()?;

            line.clear();
            if reader.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }

            match line.trim() {
                "" | "c" | "continue" => return Ok(()),
                "q" | "quit" => {
                    tracing::debug!(trigger = %record.trigger(), "Session aborted from console");
                    return Err(Error::SessionAborted(record.trigger().clone()));
                }
                "a" | "args" => {
                    for (i, arg) in record.args().iter().enumerate() {
                        writeln!(out, "  [{i}] {arg:?}")?;
                    }
                    for (name, value) in record.kwargs() {
                        writeln!(out, "  {name} = {value:?}")?;
                    }
                }
                "bt" | "backtrace" => match inspection.failure() {
                    Some(failure) => writeln!(out, "{}", failure.backtrace())?,
                    None => writeln!(out, "  no failure to trace")?,
                },
                "h" | "help" => writeln!(out, "  {HELP}")?,
                other => writeln!(out, "  unknown command '{other}'; {HELP}")?,
            }
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> DiagnosticSink for ConsoleBreakpoint<R, W> {
    fn inspect(&self, inspection: &Inspection<'_>) -> Result<()> {
        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (reader, writer) = &mut *io;
        self.session(inspection, reader, writer)
    }
}
