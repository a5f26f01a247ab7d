#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! In-memory presentation surface for the control panel.
//!
//! [`MemoryPanel`] stores widget state the engine writes through
//! `Presentation`. Those writes never produce events. The user-side methods
//! (`type_text`, `select_unit`, ...) change the widget and post the matching
//! [`UiEvent`] on the engine's channel.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crossbeam_channel::Sender;
use siggen_core::events::split_widget_id;
use siggen_core::UiEvent;
use siggen_traits::Presentation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Widget {
    pub text: String,
    pub unit: Option<String>,
    pub options: Vec<String>,
    pub units: Vec<String>,
}

/// One row of [`MemoryPanel::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub field: String,
    pub text: String,
    pub unit: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryPanel {
    widgets: RefCell<BTreeMap<String, Widget>>,
    visible: RefCell<BTreeMap<String, bool>>,
    events: RefCell<Option<Sender<UiEvent>>>,
}

impl MemoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route user events to the engine, usually `ControlPanel::event_sender()`.
    pub fn attach(&self, events: Sender<UiEvent>) {
        *self.events.borrow_mut() = Some(events);
    }

    fn post(&self, event: UiEvent) {
        match self.events.borrow().as_ref() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    tracing::warn!("control panel dropped its event channel");
                }
            }
            None => tracing::debug!(?event, "no control panel attached"),
        }
    }

    fn with_widget<R>(&self, id: &str, f: impl FnOnce(&mut Widget) -> R) -> R {
        let mut widgets = self.widgets.borrow_mut();
        f(widgets.entry(id.to_string()).or_default())
    }

    pub fn widget(&self, id: &str) -> Option<Widget> {
        self.widgets.borrow().get(id).cloned()
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.widgets.borrow().get(id).map(|w| w.text.clone())
    }

    pub fn unit(&self, id: &str) -> Option<String> {
        self.widgets.borrow().get(id).and_then(|w| w.unit.clone())
    }

    pub fn is_visible(&self, feature: &str) -> bool {
        self.visible.borrow().get(feature).copied().unwrap_or(false)
    }

    /// Widgets of one feature, in id order.
    pub fn snapshot(&self, feature: &str) -> Vec<WidgetView> {
        self.widgets
            .borrow()
            .iter()
            .filter_map(|(id, w)| {
                let (f, field) = split_widget_id(id)?;
                (f == feature).then(|| WidgetView {
                    field: field.to_string(),
                    text: w.text.clone(),
                    unit: w.unit.clone().filter(|u| !u.is_empty()),
                })
            })
            .collect()
    }

    // ── user side ────────────────────────────────────────────────────────────

    pub fn type_text(&self, id: &str, text: &str) {
        self.with_widget(id, |w| w.text = text.to_string());
        self.post(UiEvent::TextChanged {
            widget: id.to_string(),
            text: text.to_string(),
        });
    }

    pub fn select_unit(&self, id: &str, unit: &str) {
        self.with_widget(id, |w| w.unit = Some(unit.to_string()));
        self.post(UiEvent::UnitChanged {
            widget: id.to_string(),
            unit: unit.to_string(),
        });
    }

    pub fn leave_field(&self, id: &str) {
        self.post(UiEvent::LostFocus {
            widget: id.to_string(),
        });
    }

    pub fn press_apply(&self, feature: &str) {
        self.post(UiEvent::ApplyPressed {
            feature: feature.to_string(),
        });
    }

    pub fn press_enable(&self, feature: &str) {
        self.post(UiEvent::EnableRequested {
            feature: feature.to_string(),
        });
    }

    pub fn press_disable(&self, feature: &str) {
        self.post(UiEvent::DisableRequested {
            feature: feature.to_string(),
        });
    }

    pub fn select_channel(&self, channel: u8) {
        self.post(UiEvent::ChannelSelected(channel));
    }

    /// `None` refreshes every feature.
    pub fn request_refresh(&self, feature: Option<&str>) {
        self.post(UiEvent::RefreshRequested {
            feature: feature.map(str::to_string),
        });
    }
}

impl Presentation for MemoryPanel {
    fn get_field_text(&self, id: &str) -> Option<String> {
        self.text(id)
    }

    fn set_field_text(&self, id: &str, text: &str) {
        self.with_widget(id, |w| w.text = text.to_string());
    }

    fn get_selected_unit(&self, id: &str) -> Option<String> {
        self.unit(id)
    }

    fn set_selected_unit(&self, id: &str, unit: &str) {
        self.with_widget(id, |w| w.unit = Some(unit.to_string()));
    }

    fn set_field_options(&self, id: &str, options: &[String]) {
        self.with_widget(id, |w| w.options = options.to_vec());
    }

    fn set_unit_options(&self, id: &str, units: &[String]) {
        self.with_widget(id, |w| w.units = units.to_vec());
    }

    fn set_controls_visible(&self, feature: &str, visible: bool) {
        self.visible.borrow_mut().insert(feature.to_string(), visible);
    }
}
