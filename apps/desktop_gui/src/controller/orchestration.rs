//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd` without blocking. Returns false when it could not be queued,
/// with the reason written to `status`.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> bool {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker stopped; restart the application".to_string();
            tracing::error!(command = cmd_name, "ui->backend command queue disconnected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn full_queue_reports_status() {
        let (tx, _rx) = bounded(1);
        let mut status = String::new();
        assert!(dispatch_backend_command(&tx, BackendCommand::CheckHealth, &mut status));
        assert!(!dispatch_backend_command(&tx, BackendCommand::CheckHealth, &mut status));
        assert!(status.contains("full"));
    }

    #[test]
    fn disconnected_queue_reports_status() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let mut status = String::new();
        assert!(!dispatch_backend_command(
            &tx,
            BackendCommand::CancelSubmissions,
            &mut status
        ));
        assert!(status.contains("stopped"));
    }
}
