#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Parameter synchronization engine for a dual-channel waveform generator.
//!
//! The engine keeps UI fields and instrument state consistent. It talks to the
//! instrument through `siggen_traits::DeviceProxy` and to the widgets through
//! `siggen_traits::Presentation`; everything runs on one cooperative loop.
//!
//! ## Architecture
//!
//! - **Units**: unit families, base conversion and auto-ranging (`units`)
//! - **Debounce**: per-field deadlines on an injected clock (`debounce`)
//! - **Fields**: text/unit/base-value mirror of one parameter (`field`)
//! - **Controllers**: per-feature lifecycle state machine (`controller`)
//! - **Panel**: event dispatch across controllers (`panel`, `runner`)
//!
//! Feature tables (command templates, ranges, option lists) are configuration
//! data from `siggen_config`, resolved once by `conversions`.

pub mod builder;
pub mod controller;
pub mod conversions;
pub mod debounce;
pub mod device;
pub mod error;
pub mod events;
pub mod field;
pub mod format;
pub mod hw_error;
pub mod logger;
pub mod mocks;
pub mod panel;
pub mod runner;
pub mod state;
pub mod units;

pub use builder::PanelBuilder;
pub use controller::{FeatureController, FeatureSpec};
pub use debounce::{DEFAULT_DEBOUNCE, DebounceState, Debouncer};
pub use device::{CommandTemplate, DeviceLink};
pub use error::{BuildError, EngineError, Result};
pub use events::{UiEvent, widget_id};
pub use field::{FieldSpec, ParameterField};
pub use logger::{LogSink, MemoryLog, TracingLog};
pub use panel::ControlPanel;
pub use state::ControllerState;
pub use units::{UnitFamily, UnitRegistry, UnitSpec};
