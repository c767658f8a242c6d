use serde::{Deserialize, Serialize};

/// Which side of a port (or aggregate) a chart reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    External,
    Internal,
    Transmit,
    Receive,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::External,
        DataType::Internal,
        DataType::Transmit,
        DataType::Receive,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            DataType::External => "external",
            DataType::Internal => "internal",
            DataType::Transmit => "transmit",
            DataType::Receive => "receive",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_key() == key)
    }
}

/// Time span a chart shows. `Current` follows the live refresh window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryType {
    Current,
    OneHour,
    TwoHours,
    SixHours,
    OneDay,
}

impl HistoryType {
    pub const ALL: [HistoryType; 5] = [
        HistoryType::Current,
        HistoryType::OneHour,
        HistoryType::TwoHours,
        HistoryType::SixHours,
        HistoryType::OneDay,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            HistoryType::Current => "current",
            HistoryType::OneHour => "one_hour",
            HistoryType::TwoHours => "two_hours",
            HistoryType::SixHours => "six_hours",
            HistoryType::OneDay => "one_day",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_key() == key)
    }

    /// Length of the history span in seconds, `None` for the live window.
    pub fn span_secs(self) -> Option<u64> {
        match self {
            HistoryType::Current => None,
            HistoryType::OneHour => Some(3_600),
            HistoryType::TwoHours => Some(7_200),
            HistoryType::SixHours => Some(21_600),
            HistoryType::OneDay => Some(86_400),
        }
    }
}

/// Strategy the data feed uses to serve an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProviderName {
    Group,
    VirtualFabric,
    Port,
}

impl DataProviderName {
    pub const ALL: [DataProviderName; 3] = [
        DataProviderName::Group,
        DataProviderName::VirtualFabric,
        DataProviderName::Port,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            DataProviderName::Group => "group",
            DataProviderName::VirtualFabric => "virtual_fabric",
            DataProviderName::Port => "port",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_resolve_back_to_their_variant() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_key(t.as_key()), Some(t));
        }
        for t in HistoryType::ALL {
            assert_eq!(HistoryType::from_key(t.as_key()), Some(t));
        }
        for p in DataProviderName::ALL {
            assert_eq!(DataProviderName::from_key(p.as_key()), Some(p));
        }
        assert_eq!(DataType::from_key("sideways"), None);
    }

    #[test]
    fn history_span_is_live_only_for_current() {
        assert_eq!(HistoryType::Current.span_secs(), None);
        assert_eq!(HistoryType::OneDay.span_secs(), Some(86_400));
    }
}
