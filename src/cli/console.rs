//! Line input from the terminal
//!
//! Stdin is read on a detached thread so a pending read never holds up
//! runtime shutdown.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;

/// Lines typed on stdin, shared by recording controls and prompts
pub struct ConsoleInput {
    lines: mpsc::UnboundedReceiver<String>,
}

impl ConsoleInput {
    /// Start reading stdin in the background
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Could not read from stdin");
        }
        Self { lines: rx }
    }

    /// Input fed from a channel instead of stdin
    pub fn from_channel(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self { lines }
    }

    /// Next line, or `None` once stdin is closed
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Ask a yes/no question; empty input picks `default`, EOF means no
    pub async fn confirm(&mut self, default: bool) -> bool {
        loop {
            let Some(line) = self.next_line().await else {
                return false;
            };
            match line.trim().to_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(lines: &[&str]) -> ConsoleInput {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        ConsoleInput::from_channel(rx)
    }

    #[tokio::test]
    async fn confirm_reads_answers() {
        let mut input = scripted(&["maybe", "Y", "no", ""]);
        assert!(input.confirm(false).await);
        assert!(!input.confirm(true).await);
        assert!(input.confirm(true).await);
    }

    #[tokio::test]
    async fn confirm_is_no_on_eof() {
        let mut input = scripted(&[]);
        assert!(!input.confirm(true).await);
    }
}
