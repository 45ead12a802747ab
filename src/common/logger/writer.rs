use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::{Arc, Mutex},
};

pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Appends to a file and trims it back to the newest `max_lines` lines every
/// tenth of `max_lines` written (at least every 50).
#[derive(Clone)]
pub(crate) struct CircularFileWriter {
    path: String,
    max_lines: u32,
    lines_since_prune: Arc<Mutex<u32>>,
}

impl CircularFileWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines,
            lines_since_prune: Arc::new(Mutex::new(0)),
        }
    }

    fn prune_threshold(&self) -> u32 {
        (self.max_lines / 10).max(50)
    }

    fn prune(&self) -> io::Result<()> {
        if !Path::new(&self.path).exists() {
            return Ok(());
        }

        let lines: Vec<String> = BufReader::new(File::open(&self.path)?)
            .lines()
            .collect::<Result<_, _>>()?;

        let keep = self.max_lines as usize;
        if lines.len() > keep {
            let mut file = File::create(&self.path)?;
            for line in &lines[lines.len() - keep..] {
                writeln!(file, "{}", line)?;
            }
        }
        Ok(())
    }
}

impl io::Write for CircularFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        let mut pending = self
            .lines_since_prune
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *pending += buf.iter().filter(|&&b| b == b'\n').count() as u32;

        if *pending >= self.prune_threshold() {
            if let Err(e) = self.prune() {
                eprintln!("Failed to prune log file: {}", e);
            }
            *pending = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CircularFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
