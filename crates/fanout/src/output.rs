//! Line-atomic output shared by every job
//!
//! All child output and status lines go through one [`OutputSink`]. Each call
//! writes exactly one complete line while holding the sink's lock, so lines
//! from concurrent jobs never interleave mid-line. Nothing else is ordered.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use colored::Colorize;

type BoxedWriter = Box<dyn Write + Send>;

struct Streams {
    out: BoxedWriter,
    err: BoxedWriter,
}

/// Shared, lock-protected pair of output and error writers
pub struct OutputSink {
    streams: Mutex<Streams>,
}

impl OutputSink {
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            streams: Mutex::new(Streams {
                out: Box::new(out),
                err: Box::new(err),
            }),
        }
    }

    /// Sink writing to the process's stdout and stderr
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Write one line to the output stream
    pub fn line(&self, text: &str) {
        let mut streams = self.lock();
        write_line(&mut streams.out, text);
    }

    /// Write one line to the error stream
    pub fn error_line(&self, text: &str) {
        let mut streams = self.lock();
        write_line(&mut streams.err, text);
    }

    /// `<tag> <text>` on the output stream
    pub fn tagged(&self, tag: &str, text: &str) {
        self.line(&format!("{tag} {text}"));
    }

    /// `<tag> <text>` on the error stream
    pub fn tagged_error(&self, tag: &str, text: &str) {
        self.error_line(&format!("{tag} {text}"));
    }

    fn lock(&self) -> MutexGuard<'_, Streams> {
        // A writer panicking mid-line leaves nothing worth discarding
        match self.streams.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

fn write_line(writer: &mut BoxedWriter, text: &str) {
    // A closed pipe (e.g. `| head`) must not take the batch down with it
    if let Err(e) = writeln!(writer, "{text}").and_then(|()| writer.flush()) {
        log::trace!("dropped output line: {e}");
    }
}

/// `[name]` tag for a directory, from its last path component
pub fn tag_for(dir: &Path, color: bool) -> String {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    let tag = format!("[{name}]");
    if color { tag.cyan().to_string() } else { tag }
}


#[cfg(test)]
mod tests {
    use super::testing::capture;
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_tag_uses_last_component() {
        assert_eq!(tag_for(Path::new("/home/me/src/api"), false), "[api]");
    }

    #[test]
    fn test_tag_for_root_falls_back_to_path() {
        assert_eq!(tag_for(Path::new("/"), false), "[/]");
    }

    #[test]
    fn test_colored_tag_keeps_name() {
        assert!(tag_for(&PathBuf::from("/x/web"), true).contains("[web]"));
    }

    #[test]
    fn test_streams_are_separate() {
        let (sink, out, err) = capture();

        sink.tagged("[a]", "hello");
        sink.tagged_error("[a]", "oops");

        assert_eq!(out.lines(), vec!["[a] hello"]);
        assert_eq!(err.lines(), vec!["[a] oops"]);
    }

    #[test]
    fn test_concurrent_lines_stay_whole() {
        let (sink, out, _err) = capture();
        let sink = Arc::new(sink);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        sink.tagged(&format!("[w{worker}]"), &format!("line {i} {}", "x".repeat(64)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = out.lines();
        assert_eq!(lines.len(), 8 * 200);
        for line in lines {
            assert!(line.starts_with("[w"), "mangled line: {line}");
            assert!(line.ends_with(&"x".repeat(64)), "mangled line: {line}");
        }
    }
}
