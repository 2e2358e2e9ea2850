//! Sequencing of layout passes: newer passes win regardless of which finishes first, and bursts
//! of resize events collapse into one pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;

/// Quiet period after the last resize before a pass starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Sequence number of one pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// Hands out strictly increasing generations.
#[derive(Debug, Default)]
pub struct Generations {
    latest: AtomicU64,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new pass, superseding every earlier one.
    pub fn begin(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == generation.0
    }
}

/// The display slot. Only the most recent pass to have started may write to it.
#[derive(Debug)]
pub struct Surface<T> {
    current: Mutex<Option<(Generation, T)>>,
}

impl<T> Default for Surface<T> {
    fn default() -> Self {
        Surface {
            current: Mutex::new(None),
        }
    }
}

impl<T: Clone> Surface<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` if `generation` is still current and no newer value is shown. Returns
    /// whether it was stored.
    pub fn commit(&self, generations: &Generations, generation: Generation, value: T) -> bool {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let newer_shown = matches!(&*current, Some((shown, _)) if *shown > generation);
        if !generations.is_current(generation) || newer_shown {
            debug!("dropping result of stale pass {generation:?}");
            return false;
        }
        *current = Some((generation, value));
        true
    }

    pub fn current(&self) -> Option<T> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|(_, value)| value.clone())
    }
}

/// Waits for an event, then keeps taking newer ones until `quiet` passes without any. Returns
/// the last event seen, or `None` once the channel is closed and drained.
pub async fn debounce<E>(rx: &mut mpsc::UnboundedReceiver<E>, quiet: Duration) -> Option<E> {
    let mut latest = rx.recv().await?;
    loop {
        match tokio::time::timeout(quiet, rx.recv()).await {
            Ok(Some(event)) => latest = event,
            Ok(None) | Err(_) => return Some(latest),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generations_increase() {
        let generations = Generations::new();
        let a = generations.begin();
        assert!(generations.is_current(a));
        let b = generations.begin();
        assert!(b > a);
        assert!(!generations.is_current(a));
        assert!(generations.is_current(b));
    }

    #[test]
    fn test_stale_pass_is_discarded() {
        let generations = Generations::new();
        let surface = Surface::new();
        let first = generations.begin();
        let second = generations.begin();
        // The newer pass finishes first; the older one must not overwrite it.
        assert!(surface.commit(&generations, second, "second"));
        assert!(!surface.commit(&generations, first, "first"));
        assert_eq!(surface.current(), Some("second"));
    }

    #[test]
    fn test_superseded_pass_cannot_commit() {
        let generations = Generations::new();
        let surface = Surface::new();
        let first = generations.begin();
        let _second = generations.begin();
        assert!(!surface.commit(&generations, first, 1));
        assert_eq!(surface.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_collapses_bursts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            for width in [800, 900, 1000] {
                tx.send(width).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_millis(1000)).await;
            tx.send(1200).unwrap();
        });
        assert_eq!(debounce(&mut rx, DEFAULT_DEBOUNCE).await, Some(1000));
        assert_eq!(debounce(&mut rx, DEFAULT_DEBOUNCE).await, Some(1200));
        assert_eq!(debounce(&mut rx, DEFAULT_DEBOUNCE).await, None);
    }
}
