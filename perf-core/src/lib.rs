pub mod chart;
pub mod controller;
pub mod dashboard;
pub mod pin;
pub mod scale;
pub mod settings;
pub mod undo;

pub use chart::{ChartFactory, ChartView, HeadlessChart, HeadlessChartFactory};
pub use controller::{
    Card, ChartGroup, ControllerContext, ControllerState, GroupController, GroupSource,
    PortCounterKind, PortKind, RefreshSummary, SourceKind,
};
pub use dashboard::Dashboard;
pub use pin::{MemoryPinBoard, PinBoard, PinCard, PinProvider};
pub use scale::{AxisRange, ScaleFamily, ScaleGroupManager, ScaleGroups};
pub use settings::PerfSettings;
pub use undo::{
    ApplyMode, DataTypeChange, HistoryTypeChange, OptionChange, UndoHistory, UndoStack,
    UndoableAction,
};

use identity::{IdentityError, PinBoardError};

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("cannot find performance item '{0}'")]
    ItemNotFound(String),
    #[error("controller '{0}' has no performance items")]
    NoItems(String),
    #[error("controller '{0}' has been cleared")]
    Cleared(String),
    #[error("controller '{0}' is already bound")]
    AlreadyBound(String),
    #[error("controller '{0}' is not attached to a pin board")]
    PinBoardUnavailable(String),
    #[error("no pin provider registered as '{0}'")]
    UnknownProvider(String),
    #[error("no pin '{name}' on provider '{provider}'")]
    UnknownPin { provider: String, name: String },
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    PinBoard(#[from] PinBoardError),
}
