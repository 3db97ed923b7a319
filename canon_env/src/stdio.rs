use io::Write;
use std::io;

/// A wrapper around the stdio facilities provided to the pool.
pub struct Stdio {
  stdio: Box<dyn StdioImpl>,
}

impl Default for Stdio {
  fn default() -> Self {
    Self {
      stdio: Box::new(StdioMock::default()),
    }
  }
}

impl Stdio {
  /// Create a new wrapper from the provided stdio facilities.
  pub fn new(stdio: Box<dyn StdioImpl>) -> Self {
    Self { stdio }
  }

  /// Get a Write to stdout.
  pub fn stdout(&mut self) -> &mut dyn Write {
    self.stdio.stdout()
  }

  /// Get a Write to stderr.
  pub fn stderr(&mut self) -> &mut dyn Write {
    self.stdio.stderr()
  }
}

pub trait StdioImpl: Send {
  fn stdout(&mut self) -> &mut dyn Write;
  fn stderr(&mut self) -> &mut dyn Write;
}

/// Stdio backed by the process's real standard streams.
pub struct StdioNative {
  stdout: io::Stdout,
  stderr: io::Stderr,
}

impl Default for StdioNative {
  fn default() -> Self {
    Self {
      stdout: io::stdout(),
      stderr: io::stderr(),
    }
  }
}

impl StdioImpl for StdioNative {
  fn stdout(&mut self) -> &mut dyn Write {
    &mut self.stdout
  }

  fn stderr(&mut self) -> &mut dyn Write {
    &mut self.stderr
  }
}

#[derive(Default)]
pub struct StdioMock {
  write: MockWrite,
}

impl StdioImpl for StdioMock {
  fn stdout(&mut self) -> &mut dyn Write {
    &mut self.write
  }

  fn stderr(&mut self) -> &mut dyn Write {
    &mut self.write
  }
}

#[derive(Default)]
pub struct MockWrite();

impl Write for MockWrite {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}
