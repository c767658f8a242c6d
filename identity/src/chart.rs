use crate::bag::PropertyBag;
use crate::types::{DataProviderName, DataType, HistoryType};
use crate::IdentityError;
use std::hash::{Hash, Hasher};

/// Separator used when a list of sources is flattened into one bag value.
pub const SOURCE_DELIMITER: char = ';';

pub mod keys {
    pub const NAME: &str = "name";
    pub const FULL_NAME: &str = "full_name";
    pub const PROVIDER: &str = "provider";
    pub const DATA_TYPE: &str = "data_type";
    pub const HISTORY_TYPE: &str = "history_type";
    pub const GROUPS: &str = "groups";
    pub const VFS: &str = "vfs";
    pub const VF: &str = "vf";
    pub const NODE_DESC: &str = "node_desc";
    pub const LID: &str = "lid";
    pub const PORT: &str = "port";
    pub const FIELD: &str = "field";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSource {
    pub vf: Option<String>,
    pub node_desc: String,
    pub lid: u32,
    pub port: u8,
}

impl PortSource {
    pub fn new(node_desc: impl Into<String>, lid: u32, port: u8) -> Self {
        Self {
            vf: None,
            node_desc: node_desc.into(),
            lid,
            port,
        }
    }

    pub fn in_vf(mut self, vf: impl Into<String>) -> Self {
        self.vf = Some(vf.into());
        self
    }
}

/// Where a chart's samples come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    Groups(Vec<String>),
    VirtualFabrics(Vec<String>),
    Port(PortSource),
    PortCounter { port: PortSource, field: String },
}

impl ChartSource {
    pub fn default_provider(&self) -> DataProviderName {
        match self {
            ChartSource::Groups(_) => DataProviderName::Group,
            ChartSource::VirtualFabrics(_) => DataProviderName::VirtualFabric,
            ChartSource::Port(_) | ChartSource::PortCounter { .. } => DataProviderName::Port,
        }
    }

    pub fn port(&self) -> Option<&PortSource> {
        match self {
            ChartSource::Port(port) | ChartSource::PortCounter { port, .. } => Some(port),
            _ => None,
        }
    }

    /// Human readable description, used for pin descriptions and logs.
    pub fn describe(&self) -> String {
        match self {
            ChartSource::Groups(names) => names.join(", "),
            ChartSource::VirtualFabrics(names) => format!("VF {}", names.join(", ")),
            ChartSource::Port(port) => describe_port(port),
            ChartSource::PortCounter { port, field } => format!("{} {field}", describe_port(port)),
        }
    }
}

fn describe_port(port: &PortSource) -> String {
    match &port.vf {
        Some(vf) => format!("{} LID {} port {} ({vf})", port.node_desc, port.lid, port.port),
        None => format!("{} LID {} port {}", port.node_desc, port.lid, port.port),
    }
}

/// Key and configuration of one chart instance.
///
/// Two identities are equal when their `name`s are equal, whatever their
/// source or selection. A pin slot on the dashboard is addressed by name, so
/// re-pinning a chart with a different configuration lands in the same slot.
#[derive(Debug, Clone)]
pub struct ChartIdentity {
    name: String,
    full_name: String,
    provider: DataProviderName,
    data_type: Option<DataType>,
    history_type: Option<HistoryType>,
    source: ChartSource,
}

impl ChartIdentity {
    pub fn new(name: impl Into<String>, full_name: impl Into<String>, source: ChartSource) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
            provider: source.default_provider(),
            data_type: None,
            history_type: None,
            source,
        }
    }

    pub fn groups<S: Into<String>>(
        name: impl Into<String>,
        full_name: impl Into<String>,
        groups: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            full_name,
            ChartSource::Groups(groups.into_iter().map(Into::into).collect()),
        )
    }

    pub fn virtual_fabrics<S: Into<String>>(
        name: impl Into<String>,
        full_name: impl Into<String>,
        vfs: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            full_name,
            ChartSource::VirtualFabrics(vfs.into_iter().map(Into::into).collect()),
        )
    }

    pub fn port(name: impl Into<String>, full_name: impl Into<String>, port: PortSource) -> Self {
        Self::new(name, full_name, ChartSource::Port(port))
    }

    pub fn port_counter(
        name: impl Into<String>,
        full_name: impl Into<String>,
        port: PortSource,
        field: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            full_name,
            ChartSource::PortCounter {
                port,
                field: field.into(),
            },
        )
    }

    pub fn with_provider(mut self, provider: DataProviderName) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_data_type(mut self, data_type: Option<DataType>) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_history_type(mut self, history_type: Option<HistoryType>) -> Self {
        self.history_type = history_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn provider(&self) -> DataProviderName {
        self.provider
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn history_type(&self) -> Option<HistoryType> {
        self.history_type
    }

    pub fn source(&self) -> &ChartSource {
        &self.source
    }

    /// Flattens the identity into a property bag.
    ///
    /// Fails without producing anything when a listed source is empty or
    /// contains [`SOURCE_DELIMITER`].
    pub fn encode(&self) -> Result<PropertyBag, IdentityError> {
        let mut bag = PropertyBag::new();
        bag.insert(keys::NAME, self.name.as_str());
        bag.insert(keys::FULL_NAME, self.full_name.as_str());
        bag.insert(keys::PROVIDER, self.provider.as_key());
        if let Some(data_type) = self.data_type {
            bag.insert(keys::DATA_TYPE, data_type.as_key());
        }
        if let Some(history_type) = self.history_type {
            bag.insert(keys::HISTORY_TYPE, history_type.as_key());
        }
        match &self.source {
            ChartSource::Groups(names) => {
                bag.insert(keys::GROUPS, join_sources(names)?);
            }
            ChartSource::VirtualFabrics(names) => {
                bag.insert(keys::VFS, join_sources(names)?);
            }
            ChartSource::Port(port) => encode_port(&mut bag, port),
            ChartSource::PortCounter { port, field } => {
                encode_port(&mut bag, port);
                bag.insert(keys::FIELD, field.as_str());
            }
        }
        Ok(bag)
    }

    /// Rebuilds an identity from a bag produced by [`ChartIdentity::encode`].
    ///
    /// The shape is picked by the first matching rule: `vfs`, then `groups`,
    /// then `lid` with `field`, then `lid` alone. Anything else is rejected.
    pub fn decode(bag: &PropertyBag) -> Result<Self, IdentityError> {
        let source = if let Some(vfs) = bag.get(keys::VFS) {
            ChartSource::VirtualFabrics(split_sources(vfs))
        } else if let Some(groups) = bag.get(keys::GROUPS) {
            ChartSource::Groups(split_sources(groups))
        } else if bag.contains(keys::LID) {
            let port = decode_port(bag)?;
            match bag.get(keys::FIELD) {
                Some(field) => ChartSource::PortCounter {
                    port,
                    field: field.to_string(),
                },
                None => ChartSource::Port(port),
            }
        } else {
            return Err(IdentityError::UnsupportedEncoding {
                bag: bag.to_string(),
            });
        };

        let name = required(bag, keys::NAME)?.to_string();
        let full_name = bag.get(keys::FULL_NAME).unwrap_or(name.as_str()).to_string();
        let provider = match bag.get(keys::PROVIDER) {
            Some(value) => DataProviderName::from_key(value)
                .ok_or_else(|| invalid(keys::PROVIDER, value))?,
            None => source.default_provider(),
        };
        let data_type = bag
            .get(keys::DATA_TYPE)
            .map(|value| DataType::from_key(value).ok_or_else(|| invalid(keys::DATA_TYPE, value)))
            .transpose()?;
        let history_type = bag
            .get(keys::HISTORY_TYPE)
            .map(|value| {
                HistoryType::from_key(value).ok_or_else(|| invalid(keys::HISTORY_TYPE, value))
            })
            .transpose()?;

        Ok(Self {
            name,
            full_name,
            provider,
            data_type,
            history_type,
            source,
        })
    }

    /// Compares every attribute, unlike `==` which only looks at the name.
    pub fn same_configuration(&self, other: &ChartIdentity) -> bool {
        self.name == other.name
            && self.full_name == other.full_name
            && self.provider == other.provider
            && self.data_type == other.data_type
            && self.history_type == other.history_type
            && self.source == other.source
    }
}

impl PartialEq for ChartIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ChartIdentity {}

impl Hash for ChartIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

fn join_sources(names: &[String]) -> Result<String, IdentityError> {
    for name in names {
        if name.is_empty() {
            return Err(IdentityError::EmptySourceComponent);
        }
        if name.contains(SOURCE_DELIMITER) {
            return Err(IdentityError::ReservedDelimiter {
                component: name.clone(),
                delimiter: SOURCE_DELIMITER,
            });
        }
    }
    Ok(names.join(&SOURCE_DELIMITER.to_string()))
}

fn split_sources(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(SOURCE_DELIMITER).map(str::to_string).collect()
}

fn encode_port(bag: &mut PropertyBag, port: &PortSource) {
    if let Some(vf) = &port.vf {
        bag.insert(keys::VF, vf.as_str());
    }
    bag.insert(keys::NODE_DESC, port.node_desc.as_str());
    bag.insert(keys::LID, port.lid.to_string());
    bag.insert(keys::PORT, port.port.to_string());
}

fn decode_port(bag: &PropertyBag) -> Result<PortSource, IdentityError> {
    let lid_value = required(bag, keys::LID)?;
    let lid = lid_value
        .parse::<u32>()
        .map_err(|_| invalid(keys::LID, lid_value))?;
    let port_value = required(bag, keys::PORT)?;
    let port = port_value
        .parse::<u8>()
        .map_err(|_| invalid(keys::PORT, port_value))?;
    Ok(PortSource {
        vf: bag.get(keys::VF).map(str::to_string),
        node_desc: required(bag, keys::NODE_DESC)?.to_string(),
        lid,
        port,
    })
}

fn required<'a>(bag: &'a PropertyBag, key: &'static str) -> Result<&'a str, IdentityError> {
    bag.get(key).ok_or(IdentityError::MissingKey(key))
}

fn invalid(key: &'static str, value: &str) -> IdentityError {
    IdentityError::InvalidValue {
        key,
        value: value.to_string(),
    }
}
