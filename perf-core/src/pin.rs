use crate::chart::ChartView;
use crate::scale::ScaleGroupManager;
use crate::CoreError;
use dashmap::DashMap;
use identity::{ChartIdentity, PinBoardDefinition, PinDescription};
use metric::MetricItem;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A materialized pin: an independent copy of an item and its own chart.
pub struct PinCard {
    identity: ChartIdentity,
    item: Arc<dyn MetricItem>,
    chart: Arc<dyn ChartView>,
    scale: Option<Arc<ScaleGroupManager>>,
}

impl PinCard {
    pub fn new(
        identity: ChartIdentity,
        item: Arc<dyn MetricItem>,
        chart: Arc<dyn ChartView>,
        scale: Option<Arc<ScaleGroupManager>>,
    ) -> Self {
        Self {
            identity,
            item,
            chart,
            scale,
        }
    }

    pub fn identity(&self) -> &ChartIdentity {
        &self.identity
    }

    pub fn item(&self) -> &Arc<dyn MetricItem> {
        &self.item
    }

    pub fn chart(&self) -> &Arc<dyn ChartView> {
        &self.chart
    }

    pub fn scale(&self) -> Option<&Arc<ScaleGroupManager>> {
        self.scale.as_ref()
    }
}

impl std::fmt::Debug for PinCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinCard")
            .field("identity", &self.identity)
            .field("chart", &self.chart.name())
            .field("scaled", &self.scale.is_some())
            .finish()
    }
}

/// Anything that can turn a pin description back into a live chart.
pub trait PinProvider: Send + Sync {
    fn create_pin(&self, identity: &ChartIdentity) -> Result<Arc<PinCard>, CoreError>;
    fn unpin(&self, identity: &ChartIdentity) -> Result<(), CoreError>;
}

/// Host-side pin surface.
///
/// Boards hold providers weakly; a provider that has been dropped is
/// treated as unregistered.
pub trait PinBoard: Send + Sync {
    fn register_pin_provider(&self, id: &str, provider: Weak<dyn PinProvider>);
    fn deregister_pin_provider(&self, id: &str);
    /// Stores the description and materializes the pin through its provider.
    fn add_pin(&self, description: PinDescription) -> Result<Arc<PinCard>, CoreError>;
    /// Drops the stored pin and asks its provider to tear the card down.
    fn remove_pin(&self, provider: &str, name: &str) -> Result<(), CoreError>;
}

type SlotKey = (String, String);

fn slot_key(provider: &str, name: &str) -> SlotKey {
    (provider.to_string(), name.to_string())
}

/// [`PinBoard`] that keeps descriptions in memory and can persist them as
/// a [`PinBoardDefinition`].
pub struct MemoryPinBoard {
    name: String,
    providers: DashMap<String, Weak<dyn PinProvider>>,
    pins: Mutex<Vec<PinDescription>>,
    cards: DashMap<SlotKey, Arc<PinCard>>,
}

impl MemoryPinBoard {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_definition(PinBoardDefinition::new(name))
    }

    pub fn from_definition(definition: PinBoardDefinition) -> Self {
        Self {
            name: definition.name,
            providers: DashMap::new(),
            pins: Mutex::new(definition.pins),
            cards: DashMap::new(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let definition = PinBoardDefinition::load_from_file(path)?;
        Ok(Self::from_definition(definition))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CoreError> {
        self.definition().save_to_file(path)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> PinBoardDefinition {
        PinBoardDefinition {
            name: self.name.clone(),
            pins: self.pins(),
        }
    }

    pub fn pins(&self) -> Vec<PinDescription> {
        self.lock().clone()
    }

    pub fn card(&self, provider: &str, name: &str) -> Option<Arc<PinCard>> {
        self.cards
            .get(&slot_key(provider, name))
            .map(|entry| entry.value().clone())
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn has_provider(&self, id: &str) -> bool {
        self.provider(id).is_ok()
    }

    /// Materializes every stored description whose provider is registered.
    /// Failures are reported per pin and leave the description in place.
    pub fn restore(&self) -> Vec<(PinDescription, Result<Arc<PinCard>, CoreError>)> {
        self.pins()
            .into_iter()
            .map(|description| {
                let result = self.open(&description);
                if let Err(err) = &result {
                    log::warn!(
                        "failed to restore pin '{}' from '{}': {}",
                        description.chart_name(),
                        description.provider,
                        err
                    );
                }
                (description, result)
            })
            .collect()
    }

    fn take_pin(&self, provider: &str, name: &str) -> Result<(), CoreError> {
        let description = {
            let mut pins = self.lock();
            let index = pins
                .iter()
                .position(|p| p.provider == provider && p.chart_name() == name)
                .ok_or_else(|| CoreError::UnknownPin {
                    provider: provider.to_string(),
                    name: name.to_string(),
                })?;
            pins.remove(index)
        };
        self.cards.remove(&slot_key(provider, name));
        match self.provider(provider) {
            Ok(live) => live.unpin(&description.identity()?),
            // provider already gone; nothing live to tear down
            Err(_) => Ok(()),
        }
    }

    fn open(&self, description: &PinDescription) -> Result<Arc<PinCard>, CoreError> {
        let provider = self.provider(&description.provider)?;
        let identity = description.identity()?;
        let card = provider.create_pin(&identity)?;
        self.cards.insert(
            slot_key(&description.provider, identity.name()),
            card.clone(),
        );
        Ok(card)
    }

    fn provider(&self, id: &str) -> Result<Arc<dyn PinProvider>, CoreError> {
        self.providers
            .get(id)
            .and_then(|entry| entry.value().upgrade())
            .ok_or_else(|| CoreError::UnknownProvider(id.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PinDescription>> {
        self.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PinBoard for MemoryPinBoard {
    fn register_pin_provider(&self, id: &str, provider: Weak<dyn PinProvider>) {
        log::debug!("pin board '{}' registered provider '{}'", self.name, id);
        self.providers.insert(id.to_string(), provider);
    }

    fn deregister_pin_provider(&self, id: &str) {
        self.providers.remove(id);
        self.cards.retain(|(provider, _), _| provider != id);
        log::debug!("pin board '{}' dropped provider '{}'", self.name, id);
    }

    fn add_pin(&self, description: PinDescription) -> Result<Arc<PinCard>, CoreError> {
        // validate before storing anything
        description.identity()?;
        let name = description.chart_name().to_string();
        let previous = {
            let mut pins = self.lock();
            match pins
                .iter()
                .position(|p| p.provider == description.provider && p.chart_name() == name)
            {
                Some(index) => Some(std::mem::replace(&mut pins[index], description.clone())),
                None => {
                    pins.push(description.clone());
                    None
                }
            }
        };
        let result = self.open(&description);
        if result.is_err() {
            let mut pins = self.lock();
            if let Some(index) = pins
                .iter()
                .position(|p| p.provider == description.provider && p.chart_name() == name)
            {
                match previous {
                    Some(old) => pins[index] = old,
                    None => {
                        pins.remove(index);
                    }
                }
            }
        }
        result
    }

    fn remove_pin(&self, provider: &str, name: &str) -> Result<(), CoreError> {
        self.take_pin(provider, name)
    }
}
