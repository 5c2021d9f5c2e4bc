mod common;

use common::{
    init_logger, Sim, SimControl, SimDriver, BRIGHTNESS, CONTRAST, POWER_LINE_FREQUENCY,
    TIME_OFFSET,
};
use v4l2_capture::control::{self, Type};
use v4l2_capture::controls::{Choice, Kind, MAX_MENU_ITEMS};
use v4l2_capture::{Config, ControlSet, Error};

fn discover(sim: &SimDriver) -> ControlSet {
    init_logger();
    ControlSet::discover(sim)
}

#[test]
fn discovery_normalizes_names_and_skips_class_headers() {
    let sim = SimDriver::camera();
    let controls = discover(&sim);

    let names: Vec<&str> = controls.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "brightness",
            "contrast",
            "white_balance_automatic",
            "power_line_frequency"
        ]
    );

    let brightness = controls.get("Brightness").unwrap();
    assert_eq!(brightness.id, BRIGHTNESS);
    assert_eq!(
        brightness.kind,
        Kind::Integer {
            min: 0,
            max: 255,
            step: 1,
            default: 128
        }
    );
    assert!(brightness.live);
    assert!(controls.get("White Balance, Automatic").is_some());
}

#[test]
fn menu_holes_are_skipped() {
    let mut sim = Sim::camera();
    sim.controls
        .iter_mut()
        .find(|c| c.desc.id == POWER_LINE_FREQUENCY)
        .unwrap()
        .menu = vec!["Disabled", "", "60 Hz"];
    let sim = SimDriver::new(sim);
    let controls = discover(&sim);

    match &controls.get("power_line_frequency").unwrap().kind {
        Kind::Enumeration { choices, default } => {
            assert_eq!(*default, 1);
            assert_eq!(
                choices,
                &vec![
                    Choice {
                        value: 0,
                        label: "Disabled".to_string()
                    },
                    Choice {
                        value: 2,
                        label: "60 Hz".to_string()
                    },
                ]
            );
        }
        other => panic!("unexpected kind {:?}", other),
    }
}

#[test]
fn disabled_controls_are_left_out() {
    let mut sim = Sim::camera();
    sim.controls[2].desc.flags = control::Flags::DISABLED;
    let sim = SimDriver::new(sim);
    let controls = discover(&sim);

    assert!(controls.get("contrast").is_none());
    assert_eq!(controls.len(), 3);
}

#[test]
fn locator_values_override_current_ones() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);
    let config: Config = "v4l2://:brightness=10:contrast=-1:power-line-frequency=60 Hz"
        .parse()
        .unwrap();
    controls.apply_config(&sim, &config);

    let state = sim.state();
    assert_eq!(state.control_value(BRIGHTNESS), Some(10));
    assert_eq!(state.control_value(POWER_LINE_FREQUENCY), Some(2));
    // Untouched controls get their current value written back.
    assert_eq!(state.control_value(CONTRAST), Some(50));
    assert!(state.control_writes.contains(&(CONTRAST, 50)));
    assert_eq!(controls.get("brightness").unwrap().value, 10);
}

#[test]
fn set_ctrls_skips_no_change_entries() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);

    let written = controls.apply_assignments(&sim, "{brightness=10,contrast=-1}");
    assert_eq!(written, 1);

    let state = sim.state();
    assert_eq!(state.control_value(BRIGHTNESS), Some(10));
    assert!(state.control_writes.iter().all(|(id, _)| *id != CONTRAST));
}

#[test]
fn set_ctrls_ignores_unknown_and_invalid_entries() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);

    let written = controls.apply_assignments(&sim, "hue=3,contrast=loud,contrast=20");
    assert_eq!(written, 1);
    assert_eq!(sim.state().control_value(CONTRAST), Some(20));
    assert_eq!(sim.state().control_value(BRIGHTNESS), Some(128));
}

#[test]
fn set_ctrls_leaves_range_clamping_to_the_driver() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);

    let written = controls.apply_assignments(&sim, "{brightness=999,contrast=-40}");
    assert_eq!(written, 2);
    assert!(sim.state().control_writes.contains(&(BRIGHTNESS, 999)));
    assert_eq!(sim.state().control_value(BRIGHTNESS), Some(255));
    assert_eq!(controls.get("brightness").unwrap().value, 255);
    assert_eq!(controls.get("contrast").unwrap().value, 0);
}

#[test]
fn set_ctrls_from_config() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);
    let config = Config {
        set_ctrls: Some("{brightness=33}".to_string()),
        ..Config::default()
    };
    controls.apply_config(&sim, &config);
    assert_eq!(sim.state().control_value(BRIGHTNESS), Some(33));
}

#[test]
fn reset_restores_defaults() {
    let mut sim = Sim::camera();
    sim.controls[1].value = 200;
    let sim = SimDriver::new(sim);
    let mut controls = discover(&sim);

    let config = Config {
        controls_reset: true,
        ..Config::default()
    };
    controls.apply_config(&sim, &config);
    assert_eq!(sim.state().control_value(BRIGHTNESS), Some(128));
}

#[test]
fn read_only_controls_are_only_read() {
    let mut sim = Sim::camera();
    sim.controls[1].desc.flags = control::Flags::READ_ONLY;
    sim.controls[1].value = 77;
    let sim = SimDriver::new(sim);
    let mut controls = discover(&sim);

    let config: Config = "v4l2://:brightness=10".parse().unwrap();
    controls.apply_config(&sim, &config);

    let state = sim.state();
    assert!(state.control_writes.iter().all(|(id, _)| *id != BRIGHTNESS));
    assert_eq!(controls.get("brightness").unwrap().value, 77);
}

#[test]
fn runtime_changes_are_validated_and_read_back() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);

    assert_eq!(controls.set(&sim, "contrast", 42).unwrap(), 40);
    assert_eq!(controls.get("contrast").unwrap().value, 40);

    assert_eq!(controls.set(&sim, "brightness", 300).unwrap(), 255);
    assert_eq!(controls.get("brightness").unwrap().value, 255);
    assert_eq!(controls.set(&sim, "brightness", -3).unwrap(), 0);

    assert!(matches!(
        controls.set(&sim, "white_balance_automatic", 2),
        Err(Error::InvalidControlValue { .. })
    ));
    assert!(matches!(
        controls.set(&sim, "hue", 1),
        Err(Error::UnknownControl(_))
    ));
    assert!(matches!(
        controls.set(&sim, "power_line_frequency", 7),
        Err(Error::InvalidControlValue { .. })
    ));
    assert_eq!(sim.state().control_value(BRIGHTNESS), Some(0));
}

#[test]
fn wide_controls_keep_negative_values() {
    let mut sim = Sim::camera();
    sim.controls.push(SimControl::new(
        TIME_OFFSET,
        Type::Integer64,
        "Time Offset",
        -(1 << 40),
        1 << 40,
        1,
        0,
    ));
    let sim = SimDriver::new(sim);
    let mut controls = discover(&sim);

    let config: Config = "v4l2://:time-offset=-1".parse().unwrap();
    controls.apply_config(&sim, &config);
    // -1 is the no-change sentinel, so the current value is written back.
    assert_eq!(sim.state().control_value(TIME_OFFSET), Some(0));

    assert_eq!(controls.set(&sim, "time_offset", -2).unwrap(), -2);
    assert_eq!(controls.set(&sim, "time_offset", 1 << 35).unwrap(), 1 << 35);
    assert_eq!(sim.state().control_value(TIME_OFFSET), Some(1 << 35));
    assert_eq!(controls.get("time_offset").unwrap().typ, Type::Integer64);
}

#[test]
fn integer_menus_match_their_labels() {
    let mut sim = Sim::camera();
    let mut bitrate = SimControl::new(0x0098_1002, Type::IntegerMenu, "Link Rate", 0, 2, 1, 0);
    bitrate.menu = vec!["100", "200", "400"];
    sim.controls.push(bitrate);
    let sim = SimDriver::new(sim);
    let mut controls = discover(&sim);

    assert_eq!(controls.apply_assignments(&sim, "{link_rate=200}"), 1);
    assert_eq!(sim.state().control_value(0x0098_1002), Some(1));
    assert_eq!(controls.apply_assignments(&sim, "{link_rate=2}"), 1);
    assert_eq!(sim.state().control_value(0x0098_1002), Some(2));
}

#[test]
fn oversized_menus_are_capped() {
    let mut sim = Sim::camera();
    sim.controls
        .iter_mut()
        .find(|c| c.desc.id == POWER_LINE_FREQUENCY)
        .unwrap()
        .desc
        .maximum = i64::from(u32::MAX);
    let sim = SimDriver::new(sim);
    let controls = discover(&sim);

    assert_eq!(sim.state().menu_queries, MAX_MENU_ITEMS as u32);
    match &controls.get("power_line_frequency").unwrap().kind {
        Kind::Enumeration { choices, .. } => assert_eq!(choices.len(), 3),
        other => panic!("unexpected kind {:?}", other),
    }
}

#[test]
fn driver_refusal_is_reported() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);
    sim.state().controls[1].desc.flags = control::Flags::READ_ONLY;

    match controls.set(&sim, "brightness", 5) {
        Err(Error::Control { name, source }) => {
            assert_eq!(name, "brightness");
            assert_eq!(source.raw_os_error(), Some(libc::EACCES));
        }
        other => panic!("expected a control error, got {:?}", other),
    }
}

#[test]
fn queued_changes_are_applied_in_order() {
    let sim = SimDriver::camera();
    let mut controls = discover(&sim);
    let handle = controls.handle();

    handle.set("brightness", 1).unwrap();
    handle.set("brightness", 2).unwrap();
    handle.set("nonexistent", 3).unwrap();
    assert_eq!(controls.drain(&sim), 2);
    assert_eq!(sim.state().control_value(BRIGHTNESS), Some(2));
    assert_eq!(controls.drain(&sim), 0);
}
