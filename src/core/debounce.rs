use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

/// Forwards only the last value of each burst, once `delay` passes with no
/// newer value. A pending value is flushed when the input closes.
pub fn debounce<T: Send + 'static>(
    mut input: mpsc::Receiver<T>,
    delay: Duration,
) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            if pending.is_none() {
                match input.recv().await {
                    Some(value) => pending = Some(value),
                    None => break,
                }
                continue;
            }
            match timeout(delay, input.recv()).await {
                Ok(Some(value)) => {
                    debug!("Debounce: superseded pending value");
                    pending = Some(value);
                }
                Ok(None) => {
                    if let Some(value) = pending.take() {
                        let _ = tx.send(value).await;
                    }
                    break;
                }
                Err(_) => {
                    if let Some(value) = pending.take() {
                        if tx.send(value).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    rx
}
