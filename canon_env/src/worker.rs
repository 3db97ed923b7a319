use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send>;

/// A single background thread executing queued jobs in submission order.
///
/// Dropping the worker closes the queue and joins the thread, so every job
/// accepted before the drop still runs.
pub struct Worker {
  sender: Mutex<Option<Sender<Job>>>,
  handle: Option<JoinHandle<()>>,
}

impl Worker {
  pub fn new() -> Worker {
    let (sender, receiver) = channel::<Job>();
    let handle = thread::spawn(move || {
      while let Ok(job) = receiver.recv() {
        job();
      }
    });

    Worker {
      sender: Mutex::new(Some(sender)),
      handle: Some(handle),
    }
  }

  /// Queue a job. Returns false once the worker has shut down.
  pub fn enqueue(&self, job: Job) -> bool {
    match self.sender.lock() {
      Ok(sender) => match sender.as_ref() {
        Some(sender) => sender.send(job).is_ok(),
        None => false,
      },
      Err(_) => false,
    }
  }
}

impl Default for Worker {
  fn default() -> Worker {
    Worker::new()
  }
}

impl Drop for Worker {
  fn drop(&mut self) {
    if let Ok(mut sender) = self.sender.lock() {
      sender.take();
    }
    if let Some(handle) = self.handle.take() {
      handle.join().ok();
    }
  }
}
