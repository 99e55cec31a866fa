// ABOUTME: Request window tracking outstanding requests by sequence number until their response arrives
// ABOUTME: Pluggable async RequestStore trait with a default in-memory store and deadline-bounded access

use crate::frame::Frame;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A request written to the SMSC and still awaiting its response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub frame: Frame,
    pub time_sent: Instant,
}

impl Request {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            time_sent: Instant::now(),
        }
    }

    pub fn sequence_number(&self) -> u32 {
        self.frame.sequence_number()
    }

    /// Whether this request has waited longer than `timeout`
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.time_sent.elapsed() > timeout
    }
}

/// A response matched with the request it answers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub frame: Frame,
    pub original_request: Request,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request store access timed out after {0:?}")]
    Timeout(Duration),

    /// Failure reported by a custom store backend
    #[error("request store backend failed: {0}")]
    Backend(String),
}

/// Storage for the request window.
///
/// Implementations must tolerate concurrent calls from the transmit loop,
/// the receive loop and the expiry sweep. Every operation is async so a
/// remote backend can be plugged in; callers bound each call with the
/// configured store access timeout.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn set(&self, request: Request) -> Result<(), StoreError>;

    async fn get(&self, sequence_number: u32) -> Result<Option<Request>, StoreError>;

    async fn list(&self) -> Result<Vec<Request>, StoreError>;

    async fn delete(&self, sequence_number: u32) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    async fn length(&self) -> Result<usize, StoreError>;
}

/// In-memory [`RequestStore`] keyed by sequence number
#[derive(Debug, Default)]
pub struct DefaultStore {
    requests: Mutex<HashMap<u32, Request>>,
}

impl DefaultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for DefaultStore {
    async fn set(&self, request: Request) -> Result<(), StoreError> {
        self.requests
            .lock()
            .await
            .insert(request.sequence_number(), request);
        Ok(())
    }

    async fn get(&self, sequence_number: u32) -> Result<Option<Request>, StoreError> {
        Ok(self.requests.lock().await.get(&sequence_number).cloned())
    }

    async fn list(&self) -> Result<Vec<Request>, StoreError> {
        Ok(self.requests.lock().await.values().cloned().collect())
    }

    async fn delete(&self, sequence_number: u32) -> Result<(), StoreError> {
        self.requests.lock().await.remove(&sequence_number);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.requests.lock().await.clear();
        Ok(())
    }

    async fn length(&self) -> Result<usize, StoreError> {
        Ok(self.requests.lock().await.len())
    }
}

/// A [`RequestStore`] whose every call is bounded by an access timeout
#[derive(Clone)]
pub(crate) struct Window {
    store: Arc<dyn RequestStore>,
    access_timeout: Duration,
}

impl Window {
    pub(crate) fn new(store: Arc<dyn RequestStore>, access_timeout: Duration) -> Self {
        Self {
            store,
            access_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.access_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.access_timeout))?
    }

    pub(crate) async fn set(&self, request: Request) -> Result<(), StoreError> {
        self.bounded(self.store.set(request)).await
    }

    /// Remove and return the request with this sequence number
    pub(crate) async fn take(&self, sequence_number: u32) -> Result<Option<Request>, StoreError> {
        self.bounded(async {
            let request = self.store.get(sequence_number).await?;
            if request.is_some() {
                self.store.delete(sequence_number).await?;
            }
            Ok::<_, StoreError>(request)
        })
        .await
    }

    pub(crate) async fn list(&self) -> Result<Vec<Request>, StoreError> {
        self.bounded(self.store.list()).await
    }

    pub(crate) async fn delete(&self, sequence_number: u32) -> Result<(), StoreError> {
        self.bounded(self.store.delete(sequence_number)).await
    }

    pub(crate) async fn length(&self) -> Result<usize, StoreError> {
        self.bounded(self.store.length()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::EnquireLink;

    fn request(sequence_number: u32) -> Request {
        Request::new(Frame::EnquireLink(EnquireLink::new(sequence_number)))
    }

    #[tokio::test]
    async fn default_store_operations() {
        let store = DefaultStore::new();
        store.set(request(1)).await.unwrap();
        store.set(request(2)).await.unwrap();
        // Same key overwrites
        store.set(request(2)).await.unwrap();
        assert_eq!(store.length().await.unwrap(), 2);

        assert_eq!(store.get(1).await.unwrap().unwrap().sequence_number(), 1);
        assert!(store.get(3).await.unwrap().is_none());

        store.delete(1).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn take_removes_entry() {
        let window = Window::new(Arc::new(DefaultStore::new()), Duration::from_millis(100));
        window.set(request(7)).await.unwrap();

        let taken = window.take(7).await.unwrap().unwrap();
        assert_eq!(taken.sequence_number(), 7);
        assert!(window.take(7).await.unwrap().is_none());
        assert_eq!(window.length().await.unwrap(), 0);
    }

    struct StalledStore;

    #[async_trait]
    impl RequestStore for StalledStore {
        async fn set(&self, _request: Request) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn get(&self, _sequence_number: u32) -> Result<Option<Request>, StoreError> {
            std::future::pending().await
        }

        async fn list(&self) -> Result<Vec<Request>, StoreError> {
            std::future::pending().await
        }

        async fn delete(&self, _sequence_number: u32) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn length(&self) -> Result<usize, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let window = Window::new(Arc::new(StalledStore), Duration::from_millis(50));
        let result = window.length().await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_uses_time_sent() {
        let request = request(1);
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(request.is_expired(Duration::from_millis(400)));
        assert!(!request.is_expired(Duration::from_millis(600)));
    }
}
