use std::{future::Future, time::Duration};

use crate::{CollabError, CollabResult};

/// Runs an operation, giving up with [CollabError::Unavailable] if it takes longer than the deadline.
/// Dropping the operation aborts whatever store call it was waiting on.
pub async fn within<F, T>(deadline: Duration, operation: F) -> CollabResult<T>
where
    F: Future<Output = CollabResult<T>>,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| {
            CollabError::Unavailable(format!(
                "operation did not finish within {}ms",
                deadline.as_millis()
            ))
        })?
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn slow_operations_are_unavailable() {
        let result = within(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn fast_operations_pass_through() {
        let result = within(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);

        let result: CollabResult<()> =
            within(Duration::from_secs(1), async { Err(CollabError::Expired) }).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Expired);
    }
}
