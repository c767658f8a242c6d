mod group;
mod kind;

pub use group::GroupController;
pub use kind::{Card, GroupSource, PortCounterKind, PortKind, SourceKind};

use crate::pin::PinBoard;
use crate::undo::UndoStack;
use crate::CoreError;
use metric::RefreshObserver;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Constructed,
    Bound,
    Active,
    Asleep,
    Cleared,
}

/// Host services a controller is bound to.
#[derive(Clone, Default)]
pub struct ControllerContext {
    pub pin_board: Option<Arc<dyn PinBoard>>,
    pub undo: Option<Arc<dyn UndoStack>>,
}

impl ControllerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pin_board(mut self, pin_board: Arc<dyn PinBoard>) -> Self {
        self.pin_board = Some(pin_board);
        self
    }

    pub fn with_undo(mut self, undo: Arc<dyn UndoStack>) -> Self {
        self.undo = Some(undo);
        self
    }
}

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Object-safe face of a controller, used by the dashboard and scheduler.
pub trait ChartGroup: Send + Sync {
    fn name(&self) -> &str;
    fn state(&self) -> ControllerState;
    fn refresh(&self, observer: &dyn RefreshObserver) -> RefreshSummary;
    fn set_sleep_mode(&self, sleep: bool) -> Result<(), CoreError>;
    fn clear(&self);
}
