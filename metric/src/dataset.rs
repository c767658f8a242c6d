use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

/// One polled value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Receives a callback after a dataset's contents changed.
///
/// Called on the thread that mutated the dataset, after the dataset's own
/// locks are released.
pub trait DatasetObserver: Send + Sync {
    fn dataset_changed(&self, dataset: &Dataset);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Shared handle to a bounded time series.
///
/// Clones share the same storage; [`Dataset::ptr_eq`] tells whether two
/// handles point at the same series.
#[derive(Clone)]
pub struct Dataset {
    inner: Arc<DatasetInner>,
}

struct DatasetInner {
    id: u64,
    name: String,
    series: RwLock<Series>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn DatasetObserver>)>>,
    next_subscription: AtomicU64,
}

struct Series {
    points: VecDeque<(f64, f64)>,
    capacity: usize,
}

impl Series {
    fn trim(&mut self) {
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }
}

impl Dataset {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(DatasetInner {
                id: NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                series: RwLock::new(Series {
                    points: VecDeque::new(),
                    capacity: capacity.max(1),
                }),
                observers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ptr_eq(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn capacity(&self) -> usize {
        self.read().capacity
    }

    pub fn len(&self) -> usize {
        self.read().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().points.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.read().points.iter().copied().collect()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.read().points.back().copied()
    }

    pub fn push(&self, time: f64, value: f64) {
        {
            let mut series = self.write();
            series.points.push_back((time, value));
            series.trim();
        }
        self.notify();
    }

    pub fn extend(&self, samples: &[Sample]) {
        if samples.is_empty() {
            return;
        }
        {
            let mut series = self.write();
            series
                .points
                .extend(samples.iter().map(|s| (s.time, s.value)));
            series.trim();
        }
        self.notify();
    }

    /// Swaps the whole series for `samples` with a single notification.
    pub fn replace(&self, samples: &[Sample]) {
        {
            let mut series = self.write();
            series.points.clear();
            series
                .points
                .extend(samples.iter().map(|s| (s.time, s.value)));
            series.trim();
        }
        self.notify();
    }

    pub fn set_capacity(&self, capacity: usize) {
        let changed = {
            let mut series = self.write();
            series.capacity = capacity.max(1);
            let before = series.points.len();
            series.trim();
            before != series.points.len()
        };
        if changed {
            self.notify();
        }
    }

    pub fn clear(&self) {
        let had_points = {
            let mut series = self.write();
            let had_points = !series.points.is_empty();
            series.points.clear();
            had_points
        };
        if had_points {
            self.notify();
        }
    }

    /// Minimum and maximum of the finite values currently held.
    pub fn range(&self) -> Option<(f64, f64)> {
        let series = self.read();
        let mut bounds: Option<(f64, f64)> = None;
        for &(_, value) in series.points.iter().filter(|(_, v)| v.is_finite()) {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
                None => (value, value),
            });
        }
        bounds
    }

    pub fn subscribe(&self, observer: Arc<dyn DatasetObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers().push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        before != observers.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    fn notify(&self) {
        let observers: Vec<Arc<dyn DatasetObserver>> = self
            .observers()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer.dataset_changed(self);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Series> {
        self.inner
            .series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Series> {
        self.inner
            .series
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Arc<dyn DatasetObserver>)>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .finish()
    }
}
