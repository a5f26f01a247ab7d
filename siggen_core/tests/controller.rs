mod common;

use common::rig;
use rstest::rstest;
use siggen_core::ControllerState;

#[test]
fn enable_issues_activation_before_the_parameter_set() {
    let mut r = rig();
    r.ctl("burst").enable();

    let cmds = r.sim.commands();
    assert_eq!(
        cmds,
        vec![
            "SOUR1:BURS:STAT ON",
            "SOUR1:BURS:MODE TRIG",
            "SOUR1:BURS:NCYC 1",
            "SOUR1:BURS:INT:PER 0.01",
            "SOUR1:BURS:PHAS 0",
            "TRIG1:SOUR IMM",
        ]
    );
    assert_eq!(r.ctl("burst").state(), ControllerState::Enabled);
    assert_eq!(r.ui.visible("burst"), Some(true));
}

#[test]
fn initialize_pushes_options_units_and_defaults_once() {
    let mut r = rig();
    r.ctl("burst").initialize_ui();
    assert_eq!(
        r.ui.options("burst.trigger"),
        Some(vec!["Internal".into(), "External".into(), "Manual".into()])
    );
    assert_eq!(
        r.ui.unit_options("burst.period"),
        Some(vec![
            "ps".into(),
            "ns".into(),
            "\u{00b5}s".into(),
            "ms".into(),
            "s".into()
        ])
    );
    assert_eq!(r.ui.text("burst.period").as_deref(), Some("10"));
    assert_eq!(r.ui.unit("burst.period").as_deref(), Some("ms"));
    assert_eq!(r.ui.text("burst.mode").as_deref(), Some("N cycle"));
    assert_eq!(r.ui.visible("burst"), Some(false));
    assert_eq!(r.ctl("burst").state(), ControllerState::Disabled);

    // second call must not reset widgets
    r.ui.put_text("burst.period", "99");
    r.ctl("burst").initialize_ui();
    assert_eq!(r.ui.text("burst.period").as_deref(), Some("99"));
}

#[test]
fn clamps_burst_cycles_to_upper_bound() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.ctl("burst").on_text_changed("cycles", "2000000");
    r.clock.advance_ms(500);

    assert_eq!(r.panel.pump(), 1);
    assert_eq!(r.last_command().as_deref(), Some("SOUR1:BURS:NCYC 1000000"));
    // the typed text stays until the next refresh
    assert_eq!(r.field_text("burst", "cycles"), "2000000");
    assert_eq!(r.base_value("burst", "cycles"), 1_000_000.0);
}

#[rstest]
#[case("1e-9", "SOUR1:BURS:INT:PER 0.000002")]
#[case("9000", "SOUR1:BURS:INT:PER 8000")]
fn clamps_burst_period_into_range(#[case] seconds: &str, #[case] want: &str) {
    let mut r = rig();
    r.ctl("burst").enable();
    r.ctl("burst").on_unit_changed("period", "s");
    r.ctl("burst").on_text_changed("period", seconds);
    r.clock.advance_ms(500);
    r.panel.pump();
    assert_eq!(r.last_command().as_deref(), Some(want));
}

#[test]
fn unparsable_text_sends_nothing_and_keeps_value() {
    let mut r = rig();
    r.ctl("burst").enable();
    let before = r.sim.commands().len();

    r.ctl("burst").on_text_changed("cycles", "abc");
    r.clock.advance_ms(500);

    assert_eq!(r.panel.pump(), 0);
    assert_eq!(r.sim.commands().len(), before);
    assert_eq!(r.base_value("burst", "cycles"), 1.0);
    assert!(r.log.contains("cycles not applied"), "{:?}", r.log.lines());
}

#[test]
fn rapid_edits_collapse_into_one_write_of_the_last_value() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.sim.clear_log();

    r.ctl("burst").on_text_changed("cycles", "5");
    r.clock.advance_ms(100);
    r.ctl("burst").on_text_changed("cycles", "6");
    r.clock.advance_ms(100);
    r.ctl("burst").on_text_changed("cycles", "7");

    r.clock.advance_ms(499);
    assert_eq!(r.panel.pump(), 0);
    r.clock.advance_ms(1);
    assert_eq!(r.panel.pump(), 1);
    assert_eq!(r.sim.commands(), vec!["SOUR1:BURS:NCYC 7"]);
    assert_eq!(r.panel.pump(), 0);
}

#[test]
fn independent_fields_run_independent_timers() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.sim.clear_log();

    r.ctl("burst").on_text_changed("cycles", "3");
    r.clock.advance_ms(300);
    r.ctl("burst").on_text_changed("phase", "90");
    r.clock.advance_ms(200);
    assert_eq!(r.panel.pump(), 1);
    r.clock.advance_ms(300);
    assert_eq!(r.panel.pump(), 1);
    assert_eq!(
        r.sim.commands(),
        vec!["SOUR1:BURS:NCYC 3", "SOUR1:BURS:PHAS 90"]
    );
}

#[test]
fn timer_firing_while_disabled_is_dropped() {
    let mut r = rig();
    r.ctl("burst").initialize_ui();
    r.ctl("burst").on_text_changed("cycles", "12");
    r.clock.advance_ms(500);

    assert_eq!(r.panel.pump(), 0);
    assert!(r.sim.commands().is_empty());
    assert!(!r.ctl("burst").has_pending());
}

#[test]
fn edits_before_initialization_are_ignored() {
    let mut r = rig();
    r.ctl("burst").on_text_changed("cycles", "12");
    assert!(!r.ctl("burst").has_pending());
    assert_eq!(r.field_text("burst", "cycles"), "1");
}

#[test]
fn disable_cancels_pending_and_restores_baseline() {
    let mut r = rig();
    r.ctl("prbs").enable();
    r.ctl("prbs").on_text_changed("amplitude", "2");
    r.ctl("prbs").disable();
    r.clock.advance_ms(1_000);
    r.panel.pump();

    assert_eq!(r.last_command().as_deref(), Some("SOUR1:FUNC SIN"));
    assert!(r.commands_containing("VOLT 2").is_empty());
    assert_eq!(r.ui.visible("prbs"), Some(false));
    assert!(!r.ctl("prbs").is_enabled());
}

#[test]
fn refresh_pulls_device_values_with_auto_ranging() {
    let mut r = rig();
    r.sim.seed("SOUR1:BURS:STAT", "ON");
    r.sim.seed("SOUR1:BURS:NCYC", "2.500000E+01");
    r.sim.seed("SOUR1:BURS:INT:PER", "1.27E-4");
    r.sim.seed("SOUR1:BURS:MODE", "GATED");
    r.sim.seed("TRIG1:SOUR", "EXT");

    r.ctl("burst").refresh();

    assert!(r.ctl("burst").is_enabled());
    assert_eq!(r.ui.visible("burst"), Some(true));
    assert_eq!(r.ui.text("burst.cycles").as_deref(), Some("25"));
    assert_eq!(r.ui.text("burst.period").as_deref(), Some("127"));
    assert_eq!(r.ui.unit("burst.period").as_deref(), Some("\u{00b5}s"));
    assert_eq!(r.ui.text("burst.mode").as_deref(), Some("Gated"));
    assert_eq!(r.ui.text("burst.trigger").as_deref(), Some("External"));
    assert!(r.sim.commands().is_empty(), "refresh never writes");
}

#[test]
fn refresh_of_inactive_mode_disables_without_error() {
    let mut r = rig();
    r.ctl("sweep").enable();
    r.sim.seed("SOUR1:SWE:STAT", "OFF");
    r.ctl("sweep").refresh();
    assert!(!r.ctl("sweep").is_enabled());
    assert_eq!(r.ui.visible("sweep"), Some(false));
}

#[test]
fn refresh_while_disconnected_leaves_fields_alone() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.ctl("burst").on_text_changed("cycles", "40");
    r.sim.seed("SOUR1:BURS:NCYC", "77");
    r.sim.set_connected(false);

    r.ctl("burst").refresh();

    assert_eq!(r.field_text("burst", "cycles"), "40");
    assert_eq!(r.base_value("burst", "cycles"), 1.0);
    assert!(r.ctl("burst").is_enabled());
    assert!(r.log.contains("refresh skipped"));
}

#[test]
fn refresh_is_synchronous_even_with_a_pending_edit() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.ctl("burst").on_text_changed("cycles", "9");
    assert!(r.ctl("burst").has_pending());
    r.sim.seed("SOUR1:BURS:NCYC", "42");

    r.ctl("burst").refresh();

    assert_eq!(r.field_text("burst", "cycles"), "42");
    assert_eq!(r.base_value("burst", "cycles"), 42.0);
    assert!(!r.ctl("burst").has_pending());
}

#[test]
fn failed_query_leaves_stale_value() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.sim.seed("SOUR1:BURS:PHAS", "45");
    r.sim.fail_queries_matching("NCYC");
    r.ctl("burst").on_text_changed("cycles", "8");

    r.ctl("burst").refresh();

    assert_eq!(r.field_text("burst", "cycles"), "8");
    assert_eq!(r.field_text("burst", "phase"), "45");
    assert!(r.log.contains("cycles not refreshed"));
}

#[test]
fn enable_disable_refresh_round_trip_despite_failures() {
    let mut r = rig();
    r.sim.fail_commands_matching("NCYC");
    r.sim.fail_commands_matching("TRIG1");

    r.ctl("burst").enable();
    assert!(r.ctl("burst").is_enabled(), "best-effort enable completes");
    assert!(r.log.contains("with 2 failed command(s)"), "{:?}", r.log.lines());
    assert_eq!(r.base_value("burst", "cycles"), 1.0);

    r.ctl("burst").disable();
    r.ctl("burst").refresh();
    assert!(!r.ctl("burst").is_enabled());
    assert_eq!(r.ui.visible("burst"), Some(false));
}

#[test]
fn failed_write_keeps_prior_base_value() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.sim.fail_commands_matching("NCYC");
    r.ctl("burst").on_text_changed("cycles", "500");
    r.clock.advance_ms(500);

    assert_eq!(r.panel.pump(), 0);
    assert_eq!(r.base_value("burst", "cycles"), 1.0);
    assert_eq!(r.field_text("burst", "cycles"), "500");
}

#[test]
fn enable_with_disconnected_device_changes_nothing() {
    let mut r = rig();
    r.sim.set_connected(false);
    r.ctl("burst").enable();
    assert_eq!(r.ctl("burst").state(), ControllerState::Disabled);
    assert!(r.log.contains("enable skipped"));
}

#[test]
fn channel_change_redirects_later_commands_only() {
    let mut r = rig();
    assert!(r.ctl("burst").set_active_channel(2));
    assert!(r.sim.commands().is_empty());
    r.ctl("burst").enable();
    assert_eq!(r.sim.commands()[0], "SOUR2:BURS:STAT ON");

    assert!(!r.ctl("burst").set_active_channel(3));
    assert!(!r.ctl("burst").set_active_channel(0));
    assert_eq!(r.ctl("burst").active_channel(), 2);
}

#[test]
fn active_token_decides_function_modes() {
    let mut r = rig();
    r.sim.seed("SOUR1:FUNC", "PRBS");
    r.ctl("prbs").refresh();
    r.ctl("dual_tone").refresh();
    assert!(r.ctl("prbs").is_enabled());
    assert!(!r.ctl("dual_tone").is_enabled());
}

#[test]
fn derived_readout_follows_text_without_device_traffic() {
    let mut r = rig();
    r.ctl("prbs").initialize_ui();
    assert_eq!(r.ui.text("prbs.bit_period").as_deref(), Some("1000"));
    assert_eq!(r.ui.unit("prbs.bit_period").as_deref(), Some("\u{00b5}s"));

    r.ctl("prbs").on_text_changed("bit_rate", "200");
    assert_eq!(r.ui.text("prbs.bit_period").as_deref(), Some("5"));
    r.ctl("prbs").on_unit_changed("bit_rate", "Mbps");
    assert_eq!(r.ui.text("prbs.bit_rate").as_deref(), Some("0.001"));
    assert!(r.sim.commands().is_empty());
}

#[test]
fn unit_change_rearms_and_writes_same_base_value() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.sim.clear_log();

    r.ctl("burst").on_unit_changed("period", "s");
    assert_eq!(r.ui.text("burst.period").as_deref(), Some("0.01"));
    assert!(r.ctl("burst").has_pending());
    r.clock.advance_ms(500);
    r.panel.pump();
    assert_eq!(r.sim.commands(), vec!["SOUR1:BURS:INT:PER 0.01"]);
}

#[test]
fn echoed_unit_selection_writes_nothing() {
    let mut r = rig();
    r.ctl("burst").enable();
    r.sim.clear_log();

    r.ctl("burst").on_unit_changed("period", "ms");
    assert!(!r.ctl("burst").has_pending());
    r.clock.advance_ms(500);
    assert_eq!(r.panel.pump(), 0);
    assert!(r.sim.commands().is_empty());
}

#[test]
fn lost_focus_normalizes_text_only() {
    let mut r = rig();
    r.ctl("sweep").initialize_ui();
    r.ctl("sweep").on_text_changed("start", " 0250.50 ");
    r.ctl("sweep").on_lost_focus("start");
    assert_eq!(r.ui.text("sweep.start").as_deref(), Some("250.5"));

    r.ctl("sweep").on_text_changed("stop", "oops");
    r.ctl("sweep").on_lost_focus("stop");
    assert_eq!(r.field_text("sweep", "stop"), "oops");
    assert!(r.sim.commands().is_empty());
}

#[test]
fn apply_button_writes_what_the_widgets_show() {
    let mut r = rig();
    assert_eq!(r.ctl("burst").on_apply_pressed(), 0);
    assert!(r.log.contains("apply ignored"));

    r.ctl("burst").enable();
    r.sim.clear_log();
    r.ui.put_text("burst.cycles", "12");
    r.ui.put_text("burst.period", "3");
    r.ui.put_unit("burst.period", "s");

    assert_eq!(r.ctl("burst").on_apply_pressed(), 5);
    let cmds = r.sim.commands();
    assert!(cmds.contains(&"SOUR1:BURS:NCYC 12".to_string()), "{cmds:?}");
    assert!(cmds.contains(&"SOUR1:BURS:INT:PER 3".to_string()), "{cmds:?}");
}

#[test]
fn echoed_programmatic_write_does_not_arm() {
    let mut r = rig();
    r.ctl("burst").enable();
    let shown = r.ui.text("burst.cycles").unwrap_or_default();
    r.ctl("burst").on_text_changed("cycles", &shown);
    assert!(!r.ctl("burst").has_pending());
}
