//! Type-state builder for [`ControlPanel`].
//!
//! The builder enforces at compile time that a device proxy and a presentation
//! adapter are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use siggen_config::FeatureCfg;
use siggen_traits::clock::{Clock, MonotonicClock};
use siggen_traits::{DeviceProxy, Presentation};

use crate::controller::{FeatureController, Shared};
use crate::conversions::feature_spec;
use crate::debounce::{DEFAULT_DEBOUNCE, Debouncer};
use crate::device::DeviceLink;
use crate::error::{BuildError, Result};
use crate::logger::{LogSink, TracingLog};
use crate::panel::ControlPanel;
use crate::units::UnitRegistry;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct PanelBuilder<D, P> {
    device: Option<Rc<dyn DeviceProxy>>,
    presentation: Option<Rc<dyn Presentation>>,
    features: Option<Vec<FeatureCfg>>,
    units: Option<UnitRegistry>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    log: Option<Rc<dyn LogSink>>,
    debounce: Option<Duration>,
    max_channels: Option<u8>,
    channel: Option<u8>,
    _d: PhantomData<D>,
    _p: PhantomData<P>,
}

impl Default for PanelBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            device: None,
            presentation: None,
            features: None,
            units: None,
            clock: None,
            log: None,
            debounce: None,
            max_channels: None,
            channel: None,
            _d: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<D, P> PanelBuilder<D, P> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<ControlPanel> {
        let device = self
            .device
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDevice))?;
        let ui = self
            .presentation
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPresentation))?;

        // ── Validation ───────────────────────────────────────────────────────
        let debounce = self.debounce.unwrap_or(DEFAULT_DEBOUNCE);
        if debounce.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "debounce interval must be > 0",
            )));
        }
        let max_channels = self.max_channels.unwrap_or(2);
        if max_channels == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_channels must be >= 1",
            )));
        }
        let channel = self.channel.unwrap_or(1);
        if channel == 0 || channel > max_channels {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "channel must be in 1..=max_channels",
            )));
        }
        let features = match self.features {
            Some(f) => f,
            None => siggen_config::builtin_features()?,
        };
        if features.is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "at least one feature table is required",
            )));
        }
        for (i, f) in features.iter().enumerate() {
            if features[..i].iter().any(|g| g.name == f.name) {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "feature names must be unique",
                )));
            }
        }

        // ── Assemble ─────────────────────────────────────────────────────────
        let units = self.units.unwrap_or_else(UnitRegistry::builtin);
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let log: Rc<dyn LogSink> = self.log.unwrap_or_else(|| Rc::new(TracingLog));
        let debouncer = Debouncer::new(debounce, clock);
        let shared = Shared {
            device: DeviceLink::new(device),
            ui,
            debouncer: debouncer.clone(),
            log: Rc::clone(&log),
        };

        let mut controllers = Vec::with_capacity(features.len());
        for cfg in &features {
            let spec = feature_spec(cfg, &units)
                .wrap_err_with(|| format!("feature '{}'", cfg.name))?;
            let controller = FeatureController::new(spec, shared.clone(), channel, max_channels)
                .wrap_err_with(|| format!("feature '{}'", cfg.name))?;
            controllers.push(controller);
        }

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        tracing::debug!(
            features = controllers.len(),
            debounce_ms = debounce.as_millis() as u64,
            channel,
            "control panel built"
        );
        Ok(ControlPanel {
            controllers,
            events_tx,
            events_rx,
            debouncer,
            log,
            active_channel: channel,
            max_channels,
        })
    }
}

/// Chainable setters that do not affect type-state.
impl<D, P> PanelBuilder<D, P> {
    /// Feature tables; defaults to the built-in catalog.
    pub fn with_features(mut self, features: Vec<FeatureCfg>) -> Self {
        self.features = Some(features);
        self
    }
    /// Unit families; defaults to [`UnitRegistry::builtin`].
    pub fn with_units(mut self, units: UnitRegistry) -> Self {
        self.units = Some(units);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Sink for the flat text log; defaults to [`TracingLog`].
    pub fn with_log(mut self, log: Rc<dyn LogSink>) -> Self {
        self.log = Some(log);
        self
    }
    pub fn with_debounce(mut self, interval: Duration) -> Self {
        self.debounce = Some(interval);
        self
    }
    pub fn with_max_channels(mut self, n: u8) -> Self {
        self.max_channels = Some(n);
        self
    }
    /// Channel selected at startup.
    pub fn with_channel(mut self, n: u8) -> Self {
        self.channel = Some(n);
        self
    }
}

// Setters that advance type-state
impl<P> PanelBuilder<Missing, P> {
    pub fn with_device(self, device: Rc<dyn DeviceProxy>) -> PanelBuilder<Set, P> {
        PanelBuilder {
            device: Some(device),
            presentation: self.presentation,
            features: self.features,
            units: self.units,
            clock: self.clock,
            log: self.log,
            debounce: self.debounce,
            max_channels: self.max_channels,
            channel: self.channel,
            _d: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<D> PanelBuilder<D, Missing> {
    pub fn with_presentation(self, ui: Rc<dyn Presentation>) -> PanelBuilder<D, Set> {
        PanelBuilder {
            device: self.device,
            presentation: Some(ui),
            features: self.features,
            units: self.units,
            clock: self.clock,
            log: self.log,
            debounce: self.debounce,
            max_channels: self.max_channels,
            channel: self.channel,
            _d: PhantomData,
            _p: PhantomData,
        }
    }
}

impl PanelBuilder<Set, Set> {
    /// Build once device and presentation are set; remaining checks are dynamic.
    pub fn build(self) -> Result<ControlPanel> {
        self.try_build()
    }
}
