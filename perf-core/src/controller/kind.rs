use crate::chart::{ChartFactory, ChartView};
use identity::{ChartIdentity, ChartSource, PortSource};
use metric::MetricItem;
use std::sync::Arc;

/// A card built for a controller and the item charts it hosts.
pub struct Card {
    pub view: Arc<dyn ChartView>,
    pub charts: Vec<String>,
}

/// What differs between controllers of group, port and port-counter charts.
pub trait SourceKind: Send + Sync {
    /// Source `item` should read from under this kind.
    fn item_source(&self, item: &dyn MetricItem) -> ChartSource;

    fn chart_identity(&self, item: &dyn MetricItem) -> ChartIdentity {
        ChartIdentity::new(item.name(), item.full_name(), self.item_source(item))
            .with_provider(item.provider())
            .with_data_type(item.data_type())
            .with_history_type(item.history_type())
    }

    /// Name of the card that hosts `item`.
    fn item_view_name(&self, item: &dyn MetricItem) -> String {
        item.name().to_string()
    }

    /// One card per item unless the kind groups them.
    fn create_cards(&self, factory: &dyn ChartFactory, items: &[Arc<dyn MetricItem>]) -> Vec<Card> {
        items
            .iter()
            .map(|item| Card {
                view: factory.create_chart(item.name(), &item.dataset()),
                charts: vec![item.name().to_string()],
            })
            .collect()
    }
}

/// Items aggregated over device groups or virtual fabrics.
#[derive(Debug, Clone)]
pub struct GroupSource {
    source: ChartSource,
}

impl GroupSource {
    pub fn groups<S: Into<String>>(groups: impl IntoIterator<Item = S>) -> Self {
        Self {
            source: ChartSource::Groups(groups.into_iter().map(Into::into).collect()),
        }
    }

    pub fn virtual_fabrics<S: Into<String>>(vfs: impl IntoIterator<Item = S>) -> Self {
        Self {
            source: ChartSource::VirtualFabrics(vfs.into_iter().map(Into::into).collect()),
        }
    }
}

impl SourceKind for GroupSource {
    fn item_source(&self, _item: &dyn MetricItem) -> ChartSource {
        self.source.clone()
    }
}

/// Items of a single port.
#[derive(Debug, Clone)]
pub struct PortKind {
    port: PortSource,
}

impl PortKind {
    pub fn new(port: PortSource) -> Self {
        Self { port }
    }
}

impl SourceKind for PortKind {
    fn item_source(&self, _item: &dyn MetricItem) -> ChartSource {
        ChartSource::Port(self.port.clone())
    }

    fn item_view_name(&self, item: &dyn MetricItem) -> String {
        format!("{} {}:{}", item.name(), self.port.lid, self.port.port)
    }

    fn create_cards(&self, factory: &dyn ChartFactory, items: &[Arc<dyn MetricItem>]) -> Vec<Card> {
        items
            .iter()
            .map(|item| {
                let name = self.item_view_name(item.as_ref());
                Card {
                    view: factory.create_card(
                        &name,
                        &[(item.name().to_string(), item.dataset())],
                    ),
                    charts: vec![item.name().to_string()],
                }
            })
            .collect()
    }
}

/// Error counters of a port; every counter shares one card and each item
/// names the counter field it reads.
#[derive(Debug, Clone)]
pub struct PortCounterKind {
    port: PortSource,
    card: String,
}

impl PortCounterKind {
    pub fn new(port: PortSource) -> Self {
        let card = format!("counters {}:{}", port.lid, port.port);
        Self { port, card }
    }
}

impl SourceKind for PortCounterKind {
    fn item_source(&self, item: &dyn MetricItem) -> ChartSource {
        ChartSource::PortCounter {
            port: self.port.clone(),
            field: item.name().to_string(),
        }
    }

    fn item_view_name(&self, _item: &dyn MetricItem) -> String {
        self.card.clone()
    }

    fn create_cards(&self, factory: &dyn ChartFactory, items: &[Arc<dyn MetricItem>]) -> Vec<Card> {
        let charts: Vec<(String, metric::Dataset)> = items
            .iter()
            .map(|item| (item.name().to_string(), item.dataset()))
            .collect();
        vec![Card {
            view: factory.create_card(&self.card, &charts),
            charts: charts.into_iter().map(|(name, _)| name).collect(),
        }]
    }
}
