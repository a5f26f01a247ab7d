//! Collaborator contracts for the parameter synchronization engine.
//!
//! The engine talks to the instrument through [`DeviceProxy`] and to the widget
//! layer through [`Presentation`]. Both are used single-threaded and shared by
//! every feature controller, so methods take `&self`; implementations use
//! interior mutability where they need state.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type at the trait boundary; the core maps it to its own typed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous command/query channel to the instrument.
pub trait DeviceProxy {
    /// Fire-and-forget write; no reply is read.
    fn send_command(&self, command: &str) -> Result<(), BoxError>;
    /// Blocking write + read of one reply line.
    fn send_query(&self, query: &str) -> Result<String, BoxError>;
    fn is_connected(&self) -> bool;
}

/// Read/write surface over the UI widgets, keyed by widget id.
///
/// Widget ids are `"<feature>.<field>"`. Writes made through this trait are
/// programmatic and must not be reported back as user edits.
pub trait Presentation {
    fn get_field_text(&self, id: &str) -> Option<String>;
    fn set_field_text(&self, id: &str, text: &str);
    /// Name of the unit currently selected next to the field, if it has one.
    fn get_selected_unit(&self, id: &str) -> Option<String>;
    fn set_selected_unit(&self, id: &str, unit: &str);
    /// Populate the option list of a choice widget.
    fn set_field_options(&self, id: &str, options: &[String]);
    /// Populate the unit selector next to a quantity widget.
    fn set_unit_options(&self, id: &str, units: &[String]);
    fn set_controls_visible(&self, feature: &str, visible: bool);
}
