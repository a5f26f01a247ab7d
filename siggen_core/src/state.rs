//! Lifecycle state of a feature controller.

/// `Uninitialized -> Disabled <-> Enabled`; `Refreshing` only while a refresh
/// is reconciling fields, during which edit notifications are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Constructed; option lists not yet pushed to the widgets.
    #[default]
    Uninitialized,
    Disabled,
    /// Mode is on at the device and controls are visible.
    Enabled,
    Refreshing,
}

impl ControllerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerState::Uninitialized => "uninitialized",
            ControllerState::Disabled => "disabled",
            ControllerState::Enabled => "enabled",
            ControllerState::Refreshing => "refreshing",
        }
    }

    /// Whether user edits are accepted in this state.
    pub fn accepts_edits(self) -> bool {
        matches!(self, ControllerState::Disabled | ControllerState::Enabled)
    }
}

impl core::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
