//! Tracing setup with identifier redaction.
//!
//! Every formatted log line passes through [`RedactingWriter`] before reaching its sink, so an
//! identifier that slips into a message or field is masked on the way out.

use epr_core::redact_identifiers;
use std::io;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Wraps a writer and redacts identifiers in everything written through it.
///
/// Each `write` call is redacted on its own, so an identifier split across two calls passes
/// through. The fmt layer formats a whole event into one buffer before writing, which keeps
/// every identifier inside a single call.
#[derive(Debug)]
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(redact_identifiers(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`MakeWriter`] producing [`RedactingWriter`]s around another `MakeWriter`.
#[derive(Clone, Debug)]
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for RedactingMakeWriter<M> {
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(self.inner.make_writer())
    }
}

/// Installs the global subscriber: `RUST_LOG` filter plus the comma-separated
/// `default_directives`, fmt layer on stderr behind the redacting writer.
pub fn init_tracing(default_directives: &str) -> Result<(), LoggingError> {
    let mut filter = EnvFilter::from_default_env();
    for directive in default_directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(RedactingMakeWriter::new(io::stderr)))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn writer_masks_identifiers() {
        let mut out = Vec::new();
        let mut writer = RedactingWriter::new(&mut out);
        let line = b"searching 1234567890 for PAT-000001\n";
        assert_eq!(writer.write(line).unwrap(), line.len());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "searching [REDACTED-NHS] for PAT-000001\n"
        );
    }

    #[test]
    fn subscriber_output_is_redacted() {
        let buf = SharedBuf::default();
        let sink = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(RedactingMakeWriter::new(move || sink.clone()))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(identifier = "2345678901", "lookup for 3456789012");
        });

        let logged = buf.contents();
        assert!(logged.contains("[REDACTED-NHS]"));
        assert!(!logged.contains("2345678901"));
        assert!(!logged.contains("3456789012"));
    }
}
