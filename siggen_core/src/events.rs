//! Notifications posted by the presentation layer.
//!
//! Widgets are addressed as `"<feature>.<field>"`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    TextChanged { widget: String, text: String },
    UnitChanged { widget: String, unit: String },
    LostFocus { widget: String },
    ApplyPressed { feature: String },
    EnableRequested { feature: String },
    DisableRequested { feature: String },
    /// `None` refreshes every feature.
    RefreshRequested { feature: Option<String> },
    ChannelSelected(u8),
}

pub fn widget_id(feature: &str, field: &str) -> String {
    format!("{feature}.{field}")
}

/// Split a widget id into `(feature, field)`.
pub fn split_widget_id(widget: &str) -> Option<(&str, &str)> {
    let (feature, field) = widget.split_once('.')?;
    (!feature.is_empty() && !field.is_empty()).then_some((feature, field))
}
