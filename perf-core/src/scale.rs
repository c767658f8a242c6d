use crate::chart::ChartView;
use metric::{Dataset, DatasetObserver, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

/// Value-axis bounds shared by a family of charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub lower: f64,
    pub upper: f64,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
        }
    }
}

impl AxisRange {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Charts of one family share a value axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleFamily {
    DataRate,
    PacketRate,
}

impl ScaleFamily {
    pub const ALL: [ScaleFamily; 2] = [ScaleFamily::DataRate, ScaleFamily::PacketRate];
}

fn card_key(chart: &Arc<dyn ChartView>) -> usize {
    Arc::as_ptr(chart) as *const () as usize
}

/// One chart slot on a card; a card hosting several charts has one member
/// per chart.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MemberKey {
    card: usize,
    chart: String,
}

struct Member {
    key: MemberKey,
    chart: Arc<dyn ChartView>,
    dataset: Dataset,
    subscription: SubscriptionId,
}

/// Dataset subscription; holds the manager weakly so a forgotten
/// registration never keeps it alive.
struct ScaleSubscription {
    manager: Weak<ScaleGroupManager>,
}

impl DatasetObserver for ScaleSubscription {
    fn dataset_changed(&self, _dataset: &Dataset) {
        if let Some(manager) = self.manager.upgrade() {
            manager.recompute(true);
        }
    }
}

/// Keeps the value axes of a family of charts consistent.
pub struct ScaleGroupManager {
    family: ScaleFamily,
    include_zero: bool,
    members: Mutex<Vec<Member>>,
    range: RwLock<AxisRange>,
    this: Weak<ScaleGroupManager>,
}

impl ScaleGroupManager {
    pub fn new(family: ScaleFamily, include_zero: bool) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            family,
            include_zero,
            members: Mutex::new(Vec::new()),
            range: RwLock::new(AxisRange::default()),
            this: this.clone(),
        })
    }

    pub fn family(&self) -> ScaleFamily {
        self.family
    }

    /// Adds the single-chart card `chart` bound to `dataset`. A chart that
    /// is already a member is rebound to the new dataset.
    pub fn register(&self, chart: Arc<dyn ChartView>, dataset: Dataset) {
        let name = chart.name().to_string();
        self.register_chart(chart, &name, dataset);
    }

    /// Adds chart `name` hosted on `card`, bound to `dataset`. Every chart of
    /// a card counts toward the range on its own.
    pub fn register_chart(&self, card: Arc<dyn ChartView>, name: &str, dataset: Dataset) {
        let key = MemberKey {
            card: card_key(&card),
            chart: name.to_string(),
        };
        {
            let mut members = self.lock();
            if let Some(index) = members.iter().position(|m| m.key == key) {
                let old = members.remove(index);
                old.dataset.unsubscribe(old.subscription);
            }
            let subscription = dataset.subscribe(Arc::new(ScaleSubscription {
                manager: self.this.clone(),
            }));
            log::debug!(
                "registered chart '{}' with {:?} scale group",
                key.chart,
                self.family
            );
            members.push(Member {
                key,
                chart: card,
                dataset,
                subscription,
            });
        }
        self.recompute(false);
    }

    /// Removes every chart hosted on `card`. Returns false if none was a
    /// member.
    pub fn deregister(&self, card: &Arc<dyn ChartView>) -> bool {
        let card = card_key(card);
        self.remove_where(|key| key.card == card)
    }

    /// Removes chart `name` of `card`, leaving the card's other charts.
    pub fn deregister_chart(&self, card: &Arc<dyn ChartView>, name: &str) -> bool {
        let card = card_key(card);
        self.remove_where(|key| key.card == card && key.chart == name)
    }

    fn remove_where(&self, matches: impl Fn(&MemberKey) -> bool) -> bool {
        let removed = {
            let mut members = self.lock();
            let before = members.len();
            members.retain(|member| {
                if matches(&member.key) {
                    member.dataset.unsubscribe(member.subscription);
                    false
                } else {
                    true
                }
            });
            members.len() != before
        };
        if removed {
            self.recompute(false);
        }
        removed
    }

    /// Recomputes the shared range after data on `chart` changed.
    pub fn on_dataset_changed(&self, _chart: &Arc<dyn ChartView>) -> AxisRange {
        self.recompute(true)
    }

    pub fn range(&self) -> AxisRange {
        *self.range.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True if any chart of `card` is a member.
    pub fn contains(&self, card: &Arc<dyn ChartView>) -> bool {
        let card = card_key(card);
        self.lock().iter().any(|m| m.key.card == card)
    }

    /// Every member receives the range, including the chart whose data
    /// triggered the recompute.
    fn recompute(&self, data_changed: bool) -> AxisRange {
        let members = self.lock();
        let mut bounds: Option<(f64, f64)> = None;
        for member in members.iter() {
            if let Some((lo, hi)) = member.dataset.range() {
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(lo), max.max(hi)),
                    None => (lo, hi),
                });
            }
        }
        let range = match bounds {
            None => AxisRange::default(),
            Some((lo, hi)) => {
                let lower = if self.include_zero { lo.min(0.0) } else { lo };
                let upper = if self.include_zero { hi.max(0.0) } else { hi };
                if upper > lower {
                    AxisRange::new(lower, upper)
                } else {
                    AxisRange::new(lower, lower + 1.0)
                }
            }
        };
        *self.range.write().unwrap_or_else(PoisonError::into_inner) = range;
        let mut published: Vec<usize> = Vec::with_capacity(members.len());
        for member in members.iter() {
            if !published.contains(&member.key.card) {
                published.push(member.key.card);
                member.chart.set_range(range);
            }
        }
        if data_changed {
            log::trace!(
                "{:?} scale group range now {}..{}",
                self.family,
                range.lower,
                range.upper
            );
        }
        range
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Member>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScaleGroupManager {
    fn drop(&mut self) {
        let members = self.members.get_mut().unwrap_or_else(PoisonError::into_inner);
        for member in members.drain(..) {
            member.dataset.unsubscribe(member.subscription);
        }
    }
}

/// One [`ScaleGroupManager`] per family, created on first use.
#[derive(Clone)]
pub struct ScaleGroups {
    include_zero: bool,
    managers: Arc<Mutex<HashMap<ScaleFamily, Arc<ScaleGroupManager>>>>,
}

impl Default for ScaleGroups {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ScaleGroups {
    pub fn new(include_zero: bool) -> Self {
        Self {
            include_zero,
            managers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn manager(&self, family: ScaleFamily) -> Arc<ScaleGroupManager> {
        self.managers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(family)
            .or_insert_with(|| ScaleGroupManager::new(family, self.include_zero))
            .clone()
    }

    pub fn range(&self, family: ScaleFamily) -> AxisRange {
        self.manager(family).range()
    }
}
