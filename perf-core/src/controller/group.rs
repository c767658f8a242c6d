use super::{ChartGroup, ControllerContext, ControllerState, RefreshSummary, SourceKind};
use crate::chart::{ChartFactory, ChartView};
use crate::pin::{PinCard, PinProvider};
use crate::scale::{ScaleFamily, ScaleGroupManager, ScaleGroups};
use crate::undo::{
    apply_data_type, apply_history_type, ApplyMode, DataTypeChange, HistoryTypeChange,
};
use crate::CoreError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use identity::{ChartIdentity, DataType, HistoryType, PinDescription};
use metric::{MetricItem, RefreshObserver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

#[derive(Clone)]
struct ItemView {
    view: Arc<dyn ChartView>,
    chart: String,
}

/// Drives one set of performance items: refresh, sleep, pinning and
/// option changes. `items[0]` is the primary item and stays active until
/// the controller is cleared.
pub struct GroupController<K: SourceKind> {
    name: String,
    kind: K,
    items: Vec<Arc<dyn MetricItem>>,
    families: HashMap<String, ScaleFamily>,
    pin_id: Option<String>,
    factory: Arc<dyn ChartFactory>,
    scales: ScaleGroups,
    views: RwLock<HashMap<String, ItemView>>,
    scaled: Mutex<Vec<(Arc<ScaleGroupManager>, Arc<dyn ChartView>)>>,
    pin_items: DashMap<ChartIdentity, Arc<dyn MetricItem>>,
    pin_cards: DashMap<ChartIdentity, Arc<PinCard>>,
    sleeping: AtomicBool,
    state: Mutex<ControllerState>,
    context: RwLock<ControllerContext>,
}

impl<K: SourceKind + 'static> GroupController<K> {
    pub fn new(
        name: impl Into<String>,
        kind: K,
        items: Vec<Arc<dyn MetricItem>>,
        factory: Arc<dyn ChartFactory>,
        scales: ScaleGroups,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if items.is_empty() {
            return Err(CoreError::NoItems(name));
        }
        for item in &items {
            let source = kind.item_source(item.as_ref());
            if item.source() != source {
                item.set_sources(source);
            }
            item.set_active(true);
        }
        Ok(Self {
            name,
            kind,
            items,
            families: HashMap::new(),
            pin_id: None,
            factory,
            scales,
            views: RwLock::new(HashMap::new()),
            scaled: Mutex::new(Vec::new()),
            pin_items: DashMap::new(),
            pin_cards: DashMap::new(),
            sleeping: AtomicBool::new(false),
            state: Mutex::new(ControllerState::Constructed),
            context: RwLock::new(ControllerContext::default()),
        })
    }

    /// Makes the controller's charts pinnable under provider id `id`.
    pub fn with_pin_id(mut self, id: impl Into<String>) -> Self {
        self.pin_id = Some(id.into());
        self
    }

    /// Puts `item`'s charts, and pins made from it, on `family`'s shared axis.
    pub fn with_scale_family(mut self, item: impl Into<String>, family: ScaleFamily) -> Self {
        self.families.insert(item.into(), family);
        self
    }

    /// Attaches host services, builds the chart cards and joins scale groups.
    /// A scale family assigned to an unknown item fails the bind.
    pub fn bind(self: &Arc<Self>, context: ControllerContext) -> Result<(), CoreError> {
        let mut unknown: Vec<&String> = self
            .families
            .keys()
            .filter(|name| self.item(name).is_none())
            .collect();
        unknown.sort();
        if let Some(name) = unknown.first() {
            return Err(CoreError::ItemNotFound((*name).clone()));
        }
        {
            let mut state = self.lock_state();
            match *state {
                ControllerState::Constructed => *state = ControllerState::Bound,
                ControllerState::Cleared => return Err(CoreError::Cleared(self.name.clone())),
                _ => return Err(CoreError::AlreadyBound(self.name.clone())),
            }
        }

        let mut views = HashMap::new();
        let mut scaled: Vec<(Arc<ScaleGroupManager>, Arc<dyn ChartView>)> = Vec::new();
        for card in self.kind.create_cards(self.factory.as_ref(), &self.items) {
            for chart in &card.charts {
                views.insert(
                    chart.clone(),
                    ItemView {
                        view: card.view.clone(),
                        chart: chart.clone(),
                    },
                );
                let (Some(family), Some(item)) = (self.families.get(chart), self.item(chart))
                else {
                    continue;
                };
                let manager = self.scales.manager(*family);
                manager.register_chart(card.view.clone(), chart, item.dataset());
                let joined = scaled
                    .iter()
                    .any(|(m, v)| Arc::ptr_eq(m, &manager) && Arc::ptr_eq(v, &card.view));
                if !joined {
                    scaled.push((manager, card.view.clone()));
                }
            }
        }
        *self.views.write().unwrap_or_else(PoisonError::into_inner) = views;
        *self.lock_scaled() = scaled;

        if let (Some(id), Some(board)) = (&self.pin_id, &context.pin_board) {
            let provider: Weak<Self> = Arc::downgrade(self);
            let provider: Weak<dyn PinProvider> = provider;
            board.register_pin_provider(id, provider);
        }
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = context;
        log::debug!("controller '{}' bound with {} item(s)", self.name, self.items.len());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn pin_id(&self) -> Option<&str> {
        self.pin_id.as_deref()
    }

    pub fn items(&self) -> &[Arc<dyn MetricItem>] {
        &self.items
    }

    pub fn primary(&self) -> &Arc<dyn MetricItem> {
        &self.items[0]
    }

    pub fn item(&self, name: &str) -> Option<Arc<dyn MetricItem>> {
        self.items.iter().find(|item| item.name() == name).cloned()
    }

    /// Card hosting `item`, once bound.
    pub fn view(&self, item: &str) -> Option<Arc<dyn ChartView>> {
        self.item_view(item).map(|slot| slot.view)
    }

    pub fn state(&self) -> ControllerState {
        *self.lock_state()
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping.load(Ordering::SeqCst)
    }

    pub fn pin_count(&self) -> usize {
        self.pin_cards.len()
    }

    pub fn pin_card(&self, identity: &ChartIdentity) -> Option<Arc<PinCard>> {
        self.pin_cards.get(identity).map(|entry| entry.value().clone())
    }

    pub fn pinned_item(&self, identity: &ChartIdentity) -> Option<Arc<dyn MetricItem>> {
        self.pin_items.get(identity).map(|entry| entry.value().clone())
    }

    /// Identity `item` would be pinned under.
    pub fn chart_identity(&self, item: &str) -> Result<ChartIdentity, CoreError> {
        let item = self.find(item)?;
        Ok(self.kind.chart_identity(item.as_ref()))
    }

    /// Refreshes active primary items, then a snapshot of the pinned items.
    /// Pins refresh whether or not the controller sleeps. `on_finish` fires
    /// only after a completed pass; a cleared controller does no pass.
    pub fn refresh(&self, observer: &dyn RefreshObserver) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        if self.state() == ControllerState::Cleared {
            return summary;
        }
        for item in &self.items {
            if !self.refresh_one(item, observer, &mut summary) {
                return summary;
            }
        }
        let pinned: Vec<Arc<dyn MetricItem>> = self
            .pin_items
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for item in &pinned {
            if !self.refresh_one(item, observer, &mut summary) {
                return summary;
            }
        }
        {
            let mut state = self.lock_state();
            if *state == ControllerState::Bound {
                *state = ControllerState::Active;
            }
        }
        observer.on_finish();
        summary
    }

    /// Returns false when the pass was cancelled.
    fn refresh_one(
        &self,
        item: &Arc<dyn MetricItem>,
        observer: &dyn RefreshObserver,
        summary: &mut RefreshSummary,
    ) -> bool {
        if observer.is_cancelled() {
            summary.cancelled = true;
            log::debug!("controller '{}' refresh cancelled", self.name);
            return false;
        }
        if !item.is_active() {
            summary.skipped += 1;
            return true;
        }
        match item.refresh(observer) {
            Ok(true) => summary.refreshed += 1,
            Ok(false) => {
                summary.skipped += 1;
                if observer.is_cancelled() {
                    summary.cancelled = true;
                    log::debug!("controller '{}' refresh cancelled", self.name);
                    return false;
                }
            }
            Err(err) => {
                summary.failed += 1;
                log::warn!("controller '{}': {err}", self.name);
            }
        }
        true
    }

    /// Suspends or resumes every item but the primary one. Entering sleep
    /// drops the suspended items' samples. Pins are left alone.
    pub fn set_sleep_mode(&self, sleep: bool) -> Result<(), CoreError> {
        let mut state = self.lock_state();
        if *state == ControllerState::Cleared {
            return Err(CoreError::Cleared(self.name.clone()));
        }
        self.sleeping.store(sleep, Ordering::SeqCst);
        self.items[0].set_active(true);
        for item in &self.items[1..] {
            item.set_active(!sleep);
            if sleep {
                item.clear();
            }
        }
        if *state != ControllerState::Constructed {
            *state = if sleep {
                ControllerState::Asleep
            } else {
                ControllerState::Active
            };
        }
        log::debug!("controller '{}' sleep mode {}", self.name, sleep);
        Ok(())
    }

    /// Asks the pin board to pin `item`. The board calls back into
    /// [`PinProvider::create_pin`] to materialize the card.
    pub fn request_pin(&self, item: &str) -> Result<Arc<PinCard>, CoreError> {
        self.ensure_live()?;
        let origin = self.find(item)?;
        let pin_id = self
            .pin_id
            .as_deref()
            .ok_or_else(|| CoreError::PinBoardUnavailable(self.name.clone()))?;
        let board = self
            .context()
            .pin_board
            .ok_or_else(|| CoreError::PinBoardUnavailable(self.name.clone()))?;

        let identity = self.kind.chart_identity(origin.as_ref());
        let description = PinDescription::from_identity(pin_id, &identity)?;

        let slot = self.item_view(item);
        if let Some(slot) = &slot {
            slot.view.set_pin_enabled(&slot.chart, false);
        }
        match board.add_pin(description) {
            Ok(card) => Ok(card),
            Err(err) => {
                if let Some(slot) = &slot {
                    if !self.pin_cards.contains_key(&identity) {
                        slot.view.set_pin_enabled(&slot.chart, true);
                    }
                }
                Err(err)
            }
        }
    }

    /// Builds the pin card for `identity`, or returns the live one.
    pub fn create_pin(&self, identity: &ChartIdentity) -> Result<Arc<PinCard>, CoreError> {
        self.ensure_live()?;
        let origin = self.find(identity.name())?;
        if let Some(slot) = self.item_view(identity.name()) {
            slot.view.set_pin_enabled(&slot.chart, false);
        }
        let card = match self.pin_cards.entry(identity.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let card = self.materialize(origin.as_ref(), identity);
                self.pin_items
                    .insert(identity.clone(), card.item().clone());
                entry.insert(card.clone());
                log::info!("controller '{}' pinned '{}'", self.name, identity.name());
                card
            }
        };
        Ok(card)
    }

    fn materialize(&self, origin: &dyn MetricItem, identity: &ChartIdentity) -> Arc<PinCard> {
        let item = origin.copy();
        if item.provider() != identity.provider() {
            item.set_data_provider(identity.provider());
        }
        if item.source() != *identity.source() {
            item.set_sources(identity.source().clone());
        }
        if item.data_type() != identity.data_type() {
            item.set_data_type(identity.data_type());
        }
        if item.history_type() != identity.history_type() {
            item.set_history_type(identity.history_type(), true);
        }
        item.set_active(true);

        let chart = self.factory.create_chart(identity.name(), &item.dataset());
        chart.show_data_type(identity.name(), item.data_type());
        chart.show_history_type(identity.name(), item.history_type());
        let scale = self.families.get(origin.name()).map(|family| {
            let manager = self.scales.manager(*family);
            manager.register(chart.clone(), item.dataset());
            manager
        });
        Arc::new(PinCard::new(identity.clone(), item, chart, scale))
    }

    /// Tears down the pin for `identity` and re-enables pinning on its
    /// origin chart. Unpinning something that is not pinned is a no-op.
    pub fn unpin(&self, identity: &ChartIdentity) -> Result<(), CoreError> {
        let card = self.pin_cards.remove(identity).map(|(_, card)| card);
        let item = self.pin_items.remove(identity).map(|(_, item)| item);
        if card.is_none() && self.item(identity.name()).is_none() {
            return Err(CoreError::ItemNotFound(identity.name().to_string()));
        }
        if let Some(card) = &card {
            if let Some(scale) = card.scale() {
                scale.deregister(card.chart());
            }
        }
        if let Some(item) = &item {
            item.set_active(false);
            item.clear();
        }
        if let Some(slot) = self.item_view(identity.name()) {
            slot.view.set_pin_enabled(&slot.chart, true);
        }
        match card {
            Some(_) => log::info!("controller '{}' unpinned '{}'", self.name, identity.name()),
            None => log::debug!("controller '{}': '{}' was not pinned", self.name, identity.name()),
        }
        Ok(())
    }

    pub fn set_data_type(
        &self,
        item: &str,
        data_type: Option<DataType>,
        mode: ApplyMode,
    ) -> Result<(), CoreError> {
        self.ensure_live()?;
        let target = self.find(item)?;
        let old = target.data_type();
        if old == data_type {
            return Ok(());
        }
        let Some(slot) = self.item_view(item) else {
            target.set_data_type(data_type);
            return Ok(());
        };
        apply_data_type(target.as_ref(), slot.view.as_ref(), &slot.chart, data_type);
        if mode.records_undo() {
            if let Some(undo) = self.context().undo {
                undo.add_undo_action(Box::new(DataTypeChange::new(
                    target, slot.view, slot.chart, old, data_type,
                )));
            }
        }
        Ok(())
    }

    pub fn set_history_type(
        &self,
        item: &str,
        history_type: Option<HistoryType>,
        mode: ApplyMode,
    ) -> Result<(), CoreError> {
        self.ensure_live()?;
        let target = self.find(item)?;
        let old = target.history_type();
        if old == history_type {
            return Ok(());
        }
        let Some(slot) = self.item_view(item) else {
            target.set_history_type(history_type, true);
            return Ok(());
        };
        apply_history_type(target.as_ref(), slot.view.as_ref(), &slot.chart, history_type);
        if mode.records_undo() {
            if let Some(undo) = self.context().undo {
                undo.add_undo_action(Box::new(HistoryTypeChange::new(
                    target,
                    slot.view,
                    slot.chart,
                    old,
                    history_type,
                )));
            }
        }
        Ok(())
    }

    /// Unpins everything, stops every item and leaves the scale groups and
    /// the pin board. The controller is unusable afterwards.
    pub fn clear(&self) {
        {
            let mut state = self.lock_state();
            if *state == ControllerState::Cleared {
                return;
            }
            *state = ControllerState::Cleared;
        }
        let mut pinned: Vec<ChartIdentity> =
            self.pin_cards.iter().map(|entry| entry.key().clone()).collect();
        pinned.extend(self.pin_items.iter().map(|entry| entry.key().clone()));
        for identity in pinned {
            if let Err(err) = self.unpin(&identity) {
                log::warn!("controller '{}': {err}", self.name);
            }
        }
        for item in &self.items {
            item.set_active(false);
            item.clear();
        }
        for (manager, view) in self.lock_scaled().drain(..) {
            manager.deregister(&view);
        }
        let context = self.context();
        if let (Some(id), Some(board)) = (&self.pin_id, &context.pin_board) {
            board.deregister_pin_provider(id);
        }
        log::info!("controller '{}' cleared", self.name);
    }

    fn ensure_live(&self) -> Result<(), CoreError> {
        if self.state() == ControllerState::Cleared {
            return Err(CoreError::Cleared(self.name.clone()));
        }
        Ok(())
    }

    fn find(&self, name: &str) -> Result<Arc<dyn MetricItem>, CoreError> {
        self.item(name)
            .ok_or_else(|| CoreError::ItemNotFound(name.to_string()))
    }

    fn item_view(&self, item: &str) -> Option<ItemView> {
        self.views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item)
            .cloned()
    }

    fn context(&self) -> ControllerContext {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_scaled(&self) -> MutexGuard<'_, Vec<(Arc<ScaleGroupManager>, Arc<dyn ChartView>)>> {
        self.scaled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: SourceKind + 'static> PinProvider for GroupController<K> {
    fn create_pin(&self, identity: &ChartIdentity) -> Result<Arc<PinCard>, CoreError> {
        GroupController::create_pin(self, identity)
    }

    fn unpin(&self, identity: &ChartIdentity) -> Result<(), CoreError> {
        GroupController::unpin(self, identity)
    }
}

impl<K: SourceKind + 'static> ChartGroup for GroupController<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ControllerState {
        GroupController::state(self)
    }

    fn refresh(&self, observer: &dyn RefreshObserver) -> RefreshSummary {
        GroupController::refresh(self, observer)
    }

    fn set_sleep_mode(&self, sleep: bool) -> Result<(), CoreError> {
        GroupController::set_sleep_mode(self, sleep)
    }

    fn clear(&self) {
        GroupController::clear(self)
    }
}
