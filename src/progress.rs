//! Cosmetic startup progress indicator.
//!
//! A spinner frame is printed every 100 ms from a background task until
//! [`StartupProgress::finish`] signals completion through a watch channel
//! and joins the task. Visibility is defined by the channel, not by an
//! unsynchronized shared flag.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Handle to a running spinner task.
pub struct StartupProgress {
    done: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StartupProgress {
    /// Spawns the spinner task with a leading message.
    pub fn spawn(message: impl Into<String>) -> Self {
        let (done, mut changed) = watch::channel(false);
        let message = message.into();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            let mut index = 0usize;
            loop {
                tokio::select! {
                    notified = changed.changed() => {
                        if notified.is_err() || *changed.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        print!("\r{message} {} ", FRAMES[index % FRAMES.len()]);
                        let _ = std::io::stdout().flush();
                        index += 1;
                    }
                }
            }
            println!("\r{message} done.");
        });
        Self { done, handle }
    }

    /// Signals completion and waits for the task to exit.
    pub async fn finish(self) {
        let _ = self.done.send(true);
        let _ = self.handle.await;
    }
}
