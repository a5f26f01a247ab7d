//! Feature controller: one device mode (sweep, burst, ...) and its fields.
//!
//! Nothing below the controller raises past it. Parse and device failures are
//! reported through the [`LogSink`] and leave the controller's state as it
//! was before the failed step.

use std::rc::Rc;
use std::time::Instant;

use siggen_traits::Presentation;

use crate::debounce::Debouncer;
use crate::device::{CommandTemplate, DeviceLink, parse_switch};
use crate::error::EngineError;
use crate::events::widget_id;
use crate::field::{FieldSpec, ParameterField, ValueKind};
use crate::logger::LogSink;
use crate::state::ControllerState;

/// Resolved feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub name: String,
    pub label: String,
    pub activate: Vec<CommandTemplate>,
    pub deactivate: Vec<CommandTemplate>,
    pub state_query: CommandTemplate,
    pub active_token: Option<String>,
    pub fields: Vec<FieldSpec>,
}

/// Collaborators shared by every controller of a panel.
#[derive(Clone)]
pub struct Shared {
    pub device: DeviceLink,
    pub ui: Rc<dyn Presentation>,
    pub debouncer: Debouncer,
    pub log: Rc<dyn LogSink>,
}

pub struct FeatureController {
    name: String,
    label: String,
    activate: Vec<CommandTemplate>,
    deactivate: Vec<CommandTemplate>,
    state_query: CommandTemplate,
    active_token: Option<String>,
    fields: Vec<ParameterField>,
    state: ControllerState,
    active_channel: u8,
    max_channels: u8,
    shared: Shared,
}

impl core::fmt::Debug for FeatureController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeatureController")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("active_channel", &self.active_channel)
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl FeatureController {
    pub fn new(
        spec: FeatureSpec,
        shared: Shared,
        channel: u8,
        max_channels: u8,
    ) -> Result<Self, EngineError> {
        if channel == 0 || channel > max_channels {
            return Err(EngineError::InvalidChannel {
                channel,
                max: max_channels,
            });
        }
        let fields = spec
            .fields
            .into_iter()
            .map(ParameterField::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: spec.name,
            label: spec.label,
            activate: spec.activate,
            deactivate: spec.deactivate,
            state_query: spec.state_query,
            active_token: spec.active_token,
            fields,
            state: ControllerState::Uninitialized,
            active_channel: channel,
            max_channels,
            shared,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != ControllerState::Uninitialized
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ControllerState::Enabled
    }

    pub fn active_channel(&self) -> u8 {
        self.active_channel
    }

    pub fn fields(&self) -> &[ParameterField] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&ParameterField> {
        self.fields.iter().find(|f| f.id() == id)
    }

    fn field_index(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id() == id)
    }

    fn log(&self, message: impl AsRef<str>) {
        self.shared.log.on_log(message.as_ref());
    }

    fn widget(&self, field: &str) -> String {
        widget_id(&self.name, field)
    }

    /// Write a field's text, unit and derived read-out to its widgets.
    fn push_field(&self, idx: usize) {
        let field = &self.fields[idx];
        let id = self.widget(field.id());
        if field.spec().family().is_some() {
            self.shared
                .ui
                .set_selected_unit(&id, &field.selected_unit().name);
        }
        self.shared.ui.set_field_text(&id, field.display_text());
        self.push_derived(idx);
    }

    fn push_derived(&self, idx: usize) {
        let field = &self.fields[idx];
        if let (Some(d), Some((text, unit))) = (&field.spec().derived, field.derived()) {
            let id = self.widget(&d.id);
            self.shared.ui.set_selected_unit(&id, &unit.name);
            self.shared.ui.set_field_text(&id, text);
        }
    }

    /// One-time widget setup: option lists, unit lists, defaults, hidden
    /// controls. Later calls are no-ops.
    pub fn initialize_ui(&mut self) {
        if self.state != ControllerState::Uninitialized {
            return;
        }
        for (idx, field) in self.fields.iter().enumerate() {
            let id = self.widget(field.id());
            match &field.spec().kind {
                ValueKind::Choice(opts) => {
                    let labels: Vec<String> = opts.iter().map(|o| o.label.clone()).collect();
                    self.shared.ui.set_field_options(&id, &labels);
                }
                ValueKind::Quantity(family) => {
                    self.shared.ui.set_unit_options(&id, &family.unit_names());
                }
            }
            if let Some(d) = &field.spec().derived {
                self.shared
                    .ui
                    .set_unit_options(&self.widget(&d.id), &d.family.unit_names());
            }
            self.push_field(idx);
        }
        self.shared.ui.set_controls_visible(&self.name, false);
        self.state = ControllerState::Disabled;
        tracing::debug!(feature = %self.name, "controls initialized");
    }

    /// Activate the mode and write every field (best effort: a failed command
    /// is logged and the remaining ones are still sent).
    pub fn enable(&mut self) {
        self.initialize_ui();
        if !self.shared.device.is_connected() {
            self.log(format!("{}: enable skipped, device not connected", self.label));
            return;
        }
        let mut failures = 0usize;
        for t in &self.activate {
            let cmd = t.render(self.active_channel, "");
            if let Err(e) = self.shared.device.command(&cmd) {
                failures += 1;
                self.log(format!("{}: '{cmd}' failed: {e}", self.label));
            }
        }
        for idx in 0..self.fields.len() {
            self.fields[idx].cancel_pending(&self.shared.debouncer);
            if !self.apply_field(idx) {
                failures += 1;
            }
        }
        self.state = ControllerState::Enabled;
        self.shared.ui.set_controls_visible(&self.name, true);
        if failures == 0 {
            self.log(format!("{} enabled on channel {}", self.label, self.active_channel));
        } else {
            self.log(format!(
                "{} enabled on channel {} with {failures} failed command(s)",
                self.label, self.active_channel
            ));
        }
    }

    /// Return the channel to its neutral waveform and hide the controls.
    /// Pending edits are dropped; device failures are logged only.
    ///
    /// Only an enabled feature sends its deactivation commands. Several modes
    /// share `SOUR{ch}:FUNC`, so disabling an idle one would switch off
    /// whichever sibling is running.
    pub fn disable(&mut self) {
        for f in &mut self.fields {
            f.cancel_pending(&self.shared.debouncer);
        }
        if self.state != ControllerState::Enabled {
            tracing::debug!(feature = %self.name, state = %self.state, "disable: nothing to deactivate");
            return;
        }
        for t in &self.deactivate {
            let cmd = t.render(self.active_channel, "");
            if let Err(e) = self.shared.device.command(&cmd) {
                self.log(format!("{}: '{cmd}' failed: {e}", self.label));
            }
        }
        self.state = ControllerState::Disabled;
        self.shared.ui.set_controls_visible(&self.name, false);
        self.log(format!("{} disabled on channel {}", self.label, self.active_channel));
    }

    /// Pull the mode flag and, if active, every field value from the device.
    /// Never writes to the device and never waits on the debounce timers.
    pub fn refresh(&mut self) {
        if !self.shared.device.is_connected() {
            self.log(format!("{}: refresh skipped, device not connected", self.label));
            return;
        }
        self.initialize_ui();
        let prior = self.state;
        self.state = ControllerState::Refreshing;

        let query = self.state_query.render(self.active_channel, "");
        let active = match self.shared.device.query(&query) {
            Ok(reply) => match &self.active_token {
                Some(token) => Some(reply.trim().trim_matches('"').eq_ignore_ascii_case(token)),
                None => parse_switch(&reply),
            },
            Err(e) => {
                self.log(format!("{}: state query failed: {e}", self.label));
                self.state = prior;
                return;
            }
        };
        let Some(active) = active else {
            self.log(format!("{}: unrecognized state reply", self.label));
            self.state = prior;
            return;
        };

        if !active {
            for f in &mut self.fields {
                f.cancel_pending(&self.shared.debouncer);
            }
            self.state = ControllerState::Disabled;
            self.shared.ui.set_controls_visible(&self.name, false);
            return;
        }

        let mut stale = 0usize;
        for idx in 0..self.fields.len() {
            let Some(q) = &self.fields[idx].spec().query else {
                continue;
            };
            let q = q.render(self.active_channel, "");
            let result = self.shared.device.query(&q).and_then(|reply| {
                self.fields[idx].reconcile(&reply, &self.shared.debouncer)
            });
            match result {
                Ok(()) => self.push_field(idx),
                Err(e) => {
                    stale += 1;
                    let id = self.fields[idx].id().to_string();
                    self.log(format!("{}: {id} not refreshed: {e}", self.label));
                }
            }
        }
        self.state = ControllerState::Enabled;
        self.shared.ui.set_controls_visible(&self.name, true);
        if stale > 0 {
            tracing::debug!(feature = %self.name, stale, "refresh left stale fields");
        }
    }

    /// Point subsequent commands at channel `n`. Issues nothing by itself.
    pub fn set_active_channel(&mut self, n: u8) -> bool {
        if n == 0 || n > self.max_channels {
            self.log(format!(
                "{}: {}",
                self.label,
                EngineError::InvalidChannel {
                    channel: n,
                    max: self.max_channels
                }
            ));
            return false;
        }
        self.active_channel = n;
        true
    }

    fn edit_target(&self, field: &str) -> Option<usize> {
        if !self.state.accepts_edits() {
            tracing::trace!(feature = %self.name, field, state = %self.state, "edit ignored");
            return None;
        }
        let idx = self.field_index(field);
        if idx.is_none() {
            self.log(format!("{}: {}", self.label, EngineError::UnknownField(field.to_string())));
        }
        idx
    }

    pub fn on_text_changed(&mut self, field: &str, text: &str) {
        let Some(idx) = self.edit_target(field) else {
            return;
        };
        if self.fields[idx].on_text_changed(text, &self.shared.debouncer) {
            self.push_derived(idx);
        }
    }

    pub fn on_unit_changed(&mut self, field: &str, unit: &str) {
        let Some(idx) = self.edit_target(field) else {
            return;
        };
        match self.fields[idx].on_unit_changed(unit, &self.shared.debouncer) {
            Ok(false) => {}
            Ok(true) => {
                let id = self.widget(field);
                self.shared.ui.set_field_text(&id, self.fields[idx].display_text());
                self.push_derived(idx);
            }
            Err(e) => self.log(format!("{}: {e}", self.label)),
        }
    }

    pub fn on_lost_focus(&mut self, field: &str) {
        let Some(idx) = self.edit_target(field) else {
            return;
        };
        if self.fields[idx].on_lost_focus() {
            let id = self.widget(field);
            self.shared.ui.set_field_text(&id, self.fields[idx].display_text());
        }
    }

    /// Write every field immediately from what the widgets show.
    /// Returns the number of fields written.
    pub fn on_apply_pressed(&mut self) -> usize {
        if !self.is_enabled() {
            self.log(format!("{}: apply ignored, feature is disabled", self.label));
            return 0;
        }
        let mut applied = 0;
        for idx in 0..self.fields.len() {
            let id = self.widget(self.fields[idx].id());
            let text = self.shared.ui.get_field_text(&id);
            let unit = self.shared.ui.get_selected_unit(&id);
            self.fields[idx].cancel_pending(&self.shared.debouncer);
            if let Err(e) = self.fields[idx].load(text, unit) {
                self.log(format!("{}: {e}", self.label));
                continue;
            }
            if self.apply_field(idx) {
                applied += 1;
            }
        }
        applied
    }

    /// Run the apply of every field whose timer has expired. A timer that
    /// fires while the feature is not enabled is dropped.
    pub fn fire_due(&mut self) -> usize {
        let mut applied = 0;
        for idx in 0..self.fields.len() {
            if !self.fields[idx].take_if_due(&self.shared.debouncer) {
                continue;
            }
            if !self.is_enabled() {
                tracing::debug!(
                    feature = %self.name,
                    field = self.fields[idx].id(),
                    "debounced edit dropped, feature not enabled"
                );
                continue;
            }
            if self.apply_field(idx) {
                applied += 1;
            }
        }
        applied
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.fields.iter().filter_map(ParameterField::deadline).min()
    }

    pub fn has_pending(&self) -> bool {
        self.fields.iter().any(ParameterField::is_pending)
    }

    fn apply_field(&mut self, idx: usize) -> bool {
        let channel = self.active_channel;
        match self.fields[idx].apply(&self.shared.device, channel) {
            Ok(cmd) => {
                tracing::debug!(feature = %self.name, command = %cmd, "field applied");
                true
            }
            Err(e) => {
                let id = self.fields[idx].id().to_string();
                self.log(format!("{}: {id} not applied: {e}", self.label));
                false
            }
        }
    }
}
