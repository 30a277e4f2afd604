//! Loading/Success/Error result streams for asynchronous use cases.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;

/// State of one use case invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult<T> {
  Loading,
  Success(T),
  Error(String),
}

impl<T> OperationResult<T> {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, OperationResult::Loading)
  }
}

/// Result stream of a single invocation.
///
/// Yields exactly one `Loading`, then exactly one `Success` or `Error`, then
/// ends. Each invocation gets its own stream; nothing is replayed to later
/// observers. Dropping the stream abandons the in-flight work.
pub struct Operation<T> {
  rx: mpsc::UnboundedReceiver<OperationResult<T>>,
  task: JoinHandle<()>,
}

impl<T: Send + 'static> Operation<T> {
  /// Start `work` on its own task. `Loading` is queued before the task can
  /// issue any I/O.
  ///
  /// Must be called from within a Tokio runtime.
  pub(crate) fn spawn<F>(name: &'static str, work: F) -> Self
  where
    F: Future<Output = Result<T, Error>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = tx.send(OperationResult::Loading);

    let task = tokio::spawn(async move {
      let terminal = match work.await {
        Ok(value) => {
          debug!(operation = name, "Operation succeeded");
          OperationResult::Success(value)
        }
        Err(e) => {
          warn!(operation = name, error = %e, "Operation failed");
          OperationResult::Error(e.message())
        }
      };
      // Receiver gone means the observer abandoned the call
      let _ = tx.send(terminal);
    });

    Self { rx, task }
  }
}

impl<T> Operation<T> {
  /// Receive the next state, `None` once the stream has ended
  pub async fn next_state(&mut self) -> Option<OperationResult<T>> {
    self.rx.recv().await
  }

  /// Wait for the terminal state, skipping `Loading`.
  pub async fn outcome(mut self) -> Result<T, String> {
    while let Some(state) = self.next_state().await {
      match state {
        OperationResult::Loading => continue,
        OperationResult::Success(value) => return Ok(value),
        OperationResult::Error(message) => return Err(message),
      }
    }
    Err("Operation ended without a result".to_string())
  }
}

impl<T> Stream for Operation<T> {
  type Item = OperationResult<T>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.get_mut().rx.poll_recv(cx)
  }
}

impl<T> Drop for Operation<T> {
  fn drop(&mut self) {
    self.task.abort();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;
  use std::time::Duration;

  #[tokio::test]
  async fn test_success_sequence() {
    let op = Operation::spawn("test", async { Ok::<_, Error>(42) });
    let states: Vec<_> = op.collect().await;
    assert_eq!(
      states,
      vec![OperationResult::Loading, OperationResult::Success(42)]
    );
  }

  #[tokio::test]
  async fn test_error_sequence_uses_message() {
    let op = Operation::<()>::spawn("test", async {
      Err(Error::Api {
        status: 400,
        message: "bad request".to_string(),
      })
    });
    let states: Vec<_> = op.collect().await;
    assert_eq!(
      states,
      vec![
        OperationResult::Loading,
        OperationResult::Error("bad request".to_string())
      ]
    );
  }

  #[tokio::test]
  async fn test_loading_is_available_before_work_completes() {
    let mut op = Operation::spawn("slow", async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok::<_, Error>("done")
    });

    // Loading is already queued when spawn returns
    assert_eq!(op.rx.try_recv().ok(), Some(OperationResult::Loading));
    assert_eq!(op.outcome().await, Ok("done"));
  }

  #[tokio::test]
  async fn test_drop_abandons_work() {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
    let op = Operation::spawn("abandoned", async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      let _ = done_tx.send(());
      Ok::<_, Error>(())
    });
    drop(op);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(done_rx.try_recv().is_err());
  }
}
