//! Replay-latest list snapshots.
//!
//! Each store owns a `watch` channel holding its full current snapshot and
//! republishes it after every mutation. A [`LiveList`] is one subscriber's
//! view of that channel: it always sees the latest snapshot on attach, then
//! every later one. An optional view function narrows the snapshot (limit,
//! per-server filter) without a separate query per subscriber.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;

type View<T> = Arc<dyn Fn(&[T]) -> Vec<T> + Send + Sync>;

pub struct LiveList<T> {
    rx: watch::Receiver<Arc<Vec<T>>>,
    view: View<T>,
}

impl<T> LiveList<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(rx: watch::Receiver<Arc<Vec<T>>>) -> Self {
        Self {
            rx,
            view: Arc::new(|items: &[T]| items.to_vec()),
        }
    }

    pub(crate) fn with_view<F>(rx: watch::Receiver<Arc<Vec<T>>>, view: F) -> Self
    where
        F: Fn(&[T]) -> Vec<T> + Send + Sync + 'static,
    {
        Self {
            rx,
            view: Arc::new(view),
        }
    }

    /// The current snapshot.
    pub fn latest(&self) -> Vec<T> {
        let snapshot = Arc::clone(&self.rx.borrow());
        (self.view)(&snapshot)
    }

    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once the owning store has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        self.rx.changed().await.ok()?;
        let snapshot = Arc::clone(&self.rx.borrow_and_update());
        Some((self.view)(&snapshot))
    }

    /// Stream of snapshots: the current one first, then every update.
    pub fn into_stream(self) -> impl Stream<Item = Vec<T>> + Send + 'static {
        stream::unfold((self, true), |(mut live, first)| async move {
            if first {
                let items = live.latest();
                return Some((items, (live, false)));
            }
            let items = live.changed().await?;
            Some((items, (live, false)))
        })
    }
}

impl<T> Clone for LiveList<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            view: Arc::clone(&self.view),
        }
    }
}

impl<T> fmt::Debug for LiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveList")
            .field("len", &self.rx.borrow().len())
            .finish()
    }
}
