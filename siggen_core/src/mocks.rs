//! Test and helper mocks for siggen_core

use siggen_traits::Presentation;

/// A presentation surface without widgets: reads return nothing and writes
/// are discarded. Useful for driving controllers headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn get_field_text(&self, _id: &str) -> Option<String> {
        None
    }
    fn set_field_text(&self, _id: &str, _text: &str) {}
    fn get_selected_unit(&self, _id: &str) -> Option<String> {
        None
    }
    fn set_selected_unit(&self, _id: &str, _unit: &str) {}
    fn set_field_options(&self, _id: &str, _options: &[String]) {}
    fn set_unit_options(&self, _id: &str, _units: &[String]) {}
    fn set_controls_visible(&self, _feature: &str, _visible: bool) {}
}
