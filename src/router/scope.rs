use crate::error::AppError;
use std::future::Future;
use tokio::sync::watch;

/// Lifetime of one mounted view. Requests started under a [`CancelToken`]
/// from this scope are abandoned once the scope is cancelled or dropped.
#[derive(Debug)]
pub struct ViewScope {
    shutdown: watch::Sender<bool>,
}

impl ViewScope {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            shutdown_rx: self.shutdown.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    shutdown_rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_rx.borrow() || self.shutdown_rx.has_changed().is_err()
    }

    /// Resolves once the owning scope is cancelled or gone.
    pub async fn cancelled(&self) {
        let mut rx = self.shutdown_rx.clone();
        // Err means the scope was dropped, which also counts as cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Runs `fut` unless the scope goes away first, in which case `fut` is
    /// dropped and `AppError::Cancelled` is returned.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        self.until_cancelled(fut).await?
    }

    pub async fn until_cancelled<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = T>,
    {
        if self.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AppError::Cancelled),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_while_scope_is_alive() {
        let scope = ViewScope::new();
        let result = scope.token().run(async { Ok::<_, AppError>(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let scope = ViewScope::new();
        let result: Result<(), _> = scope.token().run(async { Err(AppError::Unauthorized) }).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn cancelled_scope_refuses_new_work() {
        let scope = ViewScope::new();
        let token = scope.token();
        scope.cancel();
        assert!(token.is_cancelled());
        let result = token.run(async { Ok::<_, AppError>(1) }).await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn dropping_scope_cancels_pending_work() {
        let scope = ViewScope::new();
        let token = scope.token();
        let pending = tokio::spawn(async move {
            token
                .until_cancelled(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                })
                .await
        });

        tokio::task::yield_now().await;
        drop(scope);

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[test]
    fn token_outliving_scope_is_cancelled() {
        let token = ViewScope::new().token();
        assert!(token.is_cancelled());
    }
}
