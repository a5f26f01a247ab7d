//! Control panel: every feature controller plus the event channel the
//! presentation layer posts to.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use siggen_traits::Clock;

use crate::builder::{Missing, PanelBuilder};
use crate::controller::FeatureController;
use crate::debounce::Debouncer;
use crate::error::EngineError;
use crate::events::{UiEvent, split_widget_id};
use crate::logger::LogSink;

pub struct ControlPanel {
    pub(crate) controllers: Vec<FeatureController>,
    pub(crate) events_tx: Sender<UiEvent>,
    pub(crate) events_rx: Receiver<UiEvent>,
    pub(crate) debouncer: Debouncer,
    pub(crate) log: Rc<dyn LogSink>,
    pub(crate) active_channel: u8,
    pub(crate) max_channels: u8,
}

impl core::fmt::Debug for ControlPanel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlPanel")
            .field("controllers", &self.controllers)
            .field("active_channel", &self.active_channel)
            .field("queued", &self.events_rx.len())
            .finish()
    }
}

impl ControlPanel {
    pub fn builder() -> PanelBuilder<Missing, Missing> {
        PanelBuilder::default()
    }

    /// Sender for the presentation layer. Events are handled by [`Self::pump`].
    pub fn event_sender(&self) -> Sender<UiEvent> {
        self.events_tx.clone()
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        self.debouncer.clock()
    }

    pub fn debounce_interval(&self) -> Duration {
        self.debouncer.interval()
    }

    pub fn active_channel(&self) -> u8 {
        self.active_channel
    }

    pub fn max_channels(&self) -> u8 {
        self.max_channels
    }

    pub fn controllers(&self) -> &[FeatureController] {
        &self.controllers
    }

    pub fn controller(&self, feature: &str) -> Option<&FeatureController> {
        self.controllers.iter().find(|c| c.name() == feature)
    }

    pub fn controller_mut(&mut self, feature: &str) -> Option<&mut FeatureController> {
        self.controllers.iter_mut().find(|c| c.name() == feature)
    }

    fn lookup(&mut self, feature: &str) -> Result<&mut FeatureController, EngineError> {
        self.controllers
            .iter_mut()
            .find(|c| c.name() == feature)
            .ok_or_else(|| EngineError::UnknownFeature(feature.to_string()))
    }

    pub fn initialize_ui(&mut self) {
        for c in &mut self.controllers {
            c.initialize_ui();
        }
    }

    pub fn enable(&mut self, feature: &str) -> Result<(), EngineError> {
        self.lookup(feature)?.enable();
        Ok(())
    }

    pub fn disable(&mut self, feature: &str) -> Result<(), EngineError> {
        self.lookup(feature)?.disable();
        Ok(())
    }

    pub fn refresh(&mut self, feature: &str) -> Result<(), EngineError> {
        self.lookup(feature)?.refresh();
        Ok(())
    }

    pub fn refresh_all(&mut self) {
        for c in &mut self.controllers {
            c.refresh();
        }
    }

    pub fn apply(&mut self, feature: &str) -> Result<usize, EngineError> {
        Ok(self.lookup(feature)?.on_apply_pressed())
    }

    /// Disable every other enabled feature, then enable `feature`.
    pub fn switch_to(&mut self, feature: &str) -> Result<(), EngineError> {
        if self.controller(feature).is_none() {
            return Err(EngineError::UnknownFeature(feature.to_string()));
        }
        for c in &mut self.controllers {
            if c.name() != feature && c.is_enabled() {
                c.disable();
            }
        }
        self.enable(feature)
    }

    /// Tell every controller about the new channel. Out-of-range values are
    /// logged and ignored.
    pub fn set_active_channel(&mut self, n: u8) -> bool {
        if n == 0 || n > self.max_channels {
            self.log.on_log(
                &EngineError::InvalidChannel {
                    channel: n,
                    max: self.max_channels,
                }
                .to_string(),
            );
            return false;
        }
        self.active_channel = n;
        for c in &mut self.controllers {
            c.set_active_channel(n);
        }
        true
    }

    pub fn dispatch(&mut self, event: UiEvent) {
        let result = match event {
            UiEvent::TextChanged { widget, text } => self
                .route(&widget)
                .map(|(c, field)| c.on_text_changed(&field, &text)),
            UiEvent::UnitChanged { widget, unit } => self
                .route(&widget)
                .map(|(c, field)| c.on_unit_changed(&field, &unit)),
            UiEvent::LostFocus { widget } => {
                self.route(&widget).map(|(c, field)| c.on_lost_focus(&field))
            }
            UiEvent::ApplyPressed { feature } => self.apply(&feature).map(|_| ()),
            UiEvent::EnableRequested { feature } => self.switch_to(&feature),
            UiEvent::DisableRequested { feature } => self.disable(&feature),
            UiEvent::RefreshRequested { feature: Some(f) } => self.refresh(&f),
            UiEvent::RefreshRequested { feature: None } => {
                self.refresh_all();
                Ok(())
            }
            UiEvent::ChannelSelected(n) => {
                self.set_active_channel(n);
                Ok(())
            }
        };
        if let Err(e) = result {
            self.log.on_log(&e.to_string());
        }
    }

    fn route(&mut self, widget: &str) -> Result<(&mut FeatureController, String), EngineError> {
        let (feature, field) =
            split_widget_id(widget).ok_or_else(|| EngineError::UnknownField(widget.to_string()))?;
        let field = field.to_string();
        Ok((self.lookup(feature)?, field))
    }

    /// Handle queued events, then run every expired debounce timer.
    /// Returns the number of fields written by those timers.
    pub fn pump(&mut self) -> usize {
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
        }
        self.fire_due()
    }

    pub fn fire_due(&mut self) -> usize {
        self.controllers.iter_mut().map(|c| c.fire_due()).sum()
    }

    /// Block for at most `timeout` waiting for the next event.
    pub fn wait_event(&mut self, timeout: Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.dispatch(event);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.controllers
            .iter()
            .filter_map(FeatureController::next_deadline)
            .min()
    }

    /// Queued events or armed timers remain.
    pub fn has_pending(&self) -> bool {
        !self.events_rx.is_empty() || self.controllers.iter().any(FeatureController::has_pending)
    }
}
