//! Recording controls from OS signals and typed commands

use colored::Colorize;
use tokio::sync::mpsc;

/// What the user asked the live recording to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Pause if recording, resume if paused
    TogglePause,
    /// Stop and go on to upload
    Stop,
    /// Stop and throw the recording away
    Discard,
}

impl ControlSignal {
    /// Map a line typed on the console to a control
    pub fn from_line(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" | "resume" => Some(Self::TogglePause),
            "s" | "stop" | "q" => Some(Self::Stop),
            "x" | "discard" => Some(Self::Discard),
            _ => None,
        }
    }
}

/// OS signal handler for the live recording.
///
/// SIGINT (Ctrl-C) and SIGTERM stop the recording, SIGUSR1 toggles pause.
pub struct ControlSignals {
    receiver: mpsc::Receiver<ControlSignal>,
}

impl ControlSignals {
    /// Install the handlers and start listening
    #[cfg(unix)]
    pub fn new() -> Result<Self, std::io::Error> {
        use tokio::signal::unix::{signal, SignalKind};

        let (tx, rx) = mpsc::channel(10);

        for (kind, name, control) in [
            (SignalKind::interrupt(), "SIGINT", ControlSignal::Stop),
            (SignalKind::terminate(), "SIGTERM", ControlSignal::Stop),
            (SignalKind::user_defined1(), "SIGUSR1", ControlSignal::TogglePause),
        ] {
            let mut stream = signal(kind)?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    tracing::debug!(signal = name, "Received signal");
                    if tx.send(control).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Self { receiver: rx })
    }

    /// Install the handlers and start listening
    #[cfg(not(unix))]
    pub fn new() -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(10);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(ControlSignal::Stop).await.is_err() {
                    break;
                }
            }
        });
        Ok(Self { receiver: rx })
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<ControlSignal> {
        self.receiver.recv().await
    }
}

/// Short label echoed when a control is received
pub fn describe(control: ControlSignal) -> String {
    let arrow = "↓".cyan();
    match control {
        ControlSignal::TogglePause => format!("{} pause/resume", arrow),
        ControlSignal::Stop => format!("{} stop", arrow),
        ControlSignal::Discard => format!("{} discard", arrow),
    }
}
