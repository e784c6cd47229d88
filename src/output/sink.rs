use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// An output stream shared by every context's writer.
///
/// Owns the only lock for the stream. The lock is held for one write call,
/// never across a command's lifetime.
pub struct SharedSink {
    inner: Mutex<Box<dyn Write + Send>>,
}

impl SharedSink {
    pub fn new(writer: impl Write + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Box::new(writer)),
        })
    }

    pub fn stdout() -> Arc<Self> {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Arc<Self> {
        Self::new(io::stderr())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panicking writer must not silence every other context.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write `prefix` then `chunk` as one uninterrupted unit.
    pub fn write_prefixed(&self, prefix: &[u8], chunk: &[u8]) -> io::Result<()> {
        let mut w = self.lock();
        w.write_all(prefix)?;
        w.write_all(chunk)?;
        w.flush()
    }
}

impl Write for &SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut w = self.lock();
        w.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Labels every write with one context's prefix before forwarding it to a
/// [`SharedSink`].
///
/// Callers are expected to write one logical chunk (a line) per call.
#[derive(Clone)]
pub struct PrefixingWriter {
    label: Arc<[u8]>,
    sink: Arc<SharedSink>,
}

impl PrefixingWriter {
    pub fn new(label: Arc<[u8]>, sink: Arc<SharedSink>) -> Self {
        Self { label, sink }
    }
}

impl Write for PrefixingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.sink.write_prefixed(&self.label, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sink: &SharedSink = &self.sink;
        sink.flush()
    }
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Capture(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Capture {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn label(s: &str) -> Arc<[u8]> {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn test_writer_prepends_label() {
        let capture = Capture::default();
        let sink = SharedSink::new(capture.clone());
        let mut w = PrefixingWriter::new(label("ctx | "), sink);

        w.write_all(b"hello\n").unwrap();
        w.write_all(b"world\n").unwrap();

        assert_eq!(capture.contents(), "ctx | hello\nctx | world\n");
    }

    #[test]
    fn test_empty_write_emits_nothing() {
        let capture = Capture::default();
        let sink = SharedSink::new(capture.clone());
        let mut w = PrefixingWriter::new(label("ctx | "), sink);

        assert_eq!(w.write(b"").unwrap(), 0);
        assert_eq!(capture.contents(), "");
    }

    #[test]
    fn test_concurrent_writers_never_tear_lines() {
        let capture = Capture::default();
        let sink = SharedSink::new(capture.clone());

        let handles: Vec<_> = ["alpha | ", " beta | "]
            .into_iter()
            .map(|prefix| {
                let mut w = PrefixingWriter::new(label(prefix), sink.clone());
                thread::spawn(move || {
                    for i in 0..1000 {
                        w.write_all(format!("line {} of {}\n", i, prefix.trim()).as_bytes())
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let output = capture.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2000);
        for line in lines {
            let ok = (line.starts_with("alpha | line ") && line.ends_with(" of alpha |"))
                || (line.starts_with(" beta | line ") && line.ends_with(" of beta |"));
            assert!(ok, "torn line: {:?}", line);
        }
    }

    #[test]
    fn test_shared_sink_plain_write() {
        let capture = Capture::default();
        let sink = SharedSink::new(capture.clone());
        let mut out: &SharedSink = &sink;
        write!(out, "Continue? ").unwrap();
        assert_eq!(capture.contents(), "Continue? ");
    }
}
