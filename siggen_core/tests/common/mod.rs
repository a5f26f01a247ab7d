#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use siggen_config::FeatureCfg;
use siggen_core::{ControlPanel, FeatureController, MemoryLog};
use siggen_hardware::SimulatedGenerator;
use siggen_traits::Presentation;
use siggen_traits::clock::test_clock::TestClock;

/// Presentation double that records the last value written to each widget.
#[derive(Default)]
pub struct RecordingUi {
    texts: RefCell<HashMap<String, String>>,
    units: RefCell<HashMap<String, String>>,
    options: RefCell<HashMap<String, Vec<String>>>,
    unit_options: RefCell<HashMap<String, Vec<String>>>,
    visible: RefCell<HashMap<String, bool>>,
}

impl RecordingUi {
    pub fn text(&self, id: &str) -> Option<String> {
        self.texts.borrow().get(id).cloned()
    }
    pub fn unit(&self, id: &str) -> Option<String> {
        self.units.borrow().get(id).cloned()
    }
    pub fn options(&self, id: &str) -> Option<Vec<String>> {
        self.options.borrow().get(id).cloned()
    }
    pub fn unit_options(&self, id: &str) -> Option<Vec<String>> {
        self.unit_options.borrow().get(id).cloned()
    }
    pub fn visible(&self, feature: &str) -> Option<bool> {
        self.visible.borrow().get(feature).copied()
    }
    /// Simulate the user typing without a change notification.
    pub fn put_text(&self, id: &str, text: &str) {
        self.texts.borrow_mut().insert(id.into(), text.into());
    }
    pub fn put_unit(&self, id: &str, unit: &str) {
        self.units.borrow_mut().insert(id.into(), unit.into());
    }
}

impl Presentation for RecordingUi {
    fn get_field_text(&self, id: &str) -> Option<String> {
        self.text(id)
    }
    fn set_field_text(&self, id: &str, text: &str) {
        self.put_text(id, text);
    }
    fn get_selected_unit(&self, id: &str) -> Option<String> {
        self.unit(id)
    }
    fn set_selected_unit(&self, id: &str, unit: &str) {
        self.put_unit(id, unit);
    }
    fn set_field_options(&self, id: &str, options: &[String]) {
        self.options.borrow_mut().insert(id.into(), options.to_vec());
    }
    fn set_unit_options(&self, id: &str, units: &[String]) {
        self.unit_options.borrow_mut().insert(id.into(), units.to_vec());
    }
    fn set_controls_visible(&self, feature: &str, visible: bool) {
        self.visible.borrow_mut().insert(feature.into(), visible);
    }
}

pub struct Rig {
    pub panel: ControlPanel,
    pub sim: SimulatedGenerator,
    pub ui: Rc<RecordingUi>,
    pub clock: TestClock,
    pub log: Rc<MemoryLog>,
}

impl Rig {
    pub fn ctl(&mut self, feature: &str) -> &mut FeatureController {
        self.panel
            .controller_mut(feature)
            .unwrap_or_else(|| panic!("no feature {feature}"))
    }

    pub fn field_text(&self, feature: &str, field: &str) -> String {
        self.panel
            .controller(feature)
            .and_then(|c| c.field(field))
            .map(|f| f.display_text().to_string())
            .unwrap_or_else(|| panic!("no field {feature}.{field}"))
    }

    pub fn base_value(&self, feature: &str, field: &str) -> f64 {
        self.panel
            .controller(feature)
            .and_then(|c| c.field(field))
            .map(|f| f.base_value())
            .unwrap_or_else(|| panic!("no field {feature}.{field}"))
    }

    pub fn last_command(&self) -> Option<String> {
        self.sim.commands().last().cloned()
    }

    pub fn commands_containing(&self, needle: &str) -> Vec<String> {
        self.sim
            .commands()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }
}

pub fn builtin() -> Vec<FeatureCfg> {
    siggen_config::builtin_features().expect("builtin catalog")
}

pub fn rig() -> Rig {
    rig_with(builtin())
}

pub fn rig_with(features: Vec<FeatureCfg>) -> Rig {
    let sim = SimulatedGenerator::new();
    let ui = Rc::new(RecordingUi::default());
    let clock = TestClock::new();
    let log = Rc::new(MemoryLog::new());
    let panel = ControlPanel::builder()
        .with_device(Rc::new(sim.clone()))
        .with_presentation(ui.clone())
        .with_clock(Box::new(clock.clone()))
        .with_log(log.clone())
        .with_debounce(Duration::from_millis(500))
        .with_features(features)
        .build()
        .expect("panel builds");
    Rig {
        panel,
        sim,
        ui,
        clock,
        log,
    }
}
