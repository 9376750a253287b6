//! Cooperative cancellation for in-flight catalog requests.
//!
//! A [`CancellationToken`] is handed to every cancellable catalog call. The
//! issuer keeps a clone and calls [`cancel`](CancellationToken::cancel) when
//! the request is superseded; the transport races its I/O against
//! [`cancelled`](CancellationToken::cancelled) and resolves with
//! `CatalogError::Cancelled` if the token fires first.
//!
//! Cancellation is advisory: a transport may still deliver a result after the
//! token fired, so whoever applies results must check
//! [`is_cancelled`](CancellationToken::is_cancelled) first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable cancellation signal shared between a request and its issuer.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel can't slip between.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
