use coolmaster_net::{FanSpeed, SystemMode, UnitSystem};

#[test]
fn system_mode_roundtrip() {
    for mode in [
        SystemMode::Cool,
        SystemMode::Heat,
        SystemMode::Auto,
        SystemMode::Dry,
        SystemMode::Fan,
    ] {
        let s = mode.as_token();
        assert_eq!(SystemMode::from_token(s), Some(mode));
    }
}

#[test]
fn fan_speed_roundtrip() {
    for speed in [
        FanSpeed::Low,
        FanSpeed::Medium,
        FanSpeed::High,
        FanSpeed::Top,
        FanSpeed::Auto,
    ] {
        let s = speed.as_token();
        assert_eq!(FanSpeed::from_token(s), Some(speed));
    }
}

#[test]
fn unknown_tokens_rejected() {
    assert_eq!(SystemMode::from_token("defrost"), None);
    assert_eq!(FanSpeed::from_token("turbo"), None);
}

#[test]
fn unit_marker_defaults_to_fahrenheit() {
    assert_eq!(UnitSystem::from_status_char('C'), UnitSystem::Celsius);
    assert_eq!(UnitSystem::from_status_char('F'), UnitSystem::Fahrenheit);
    // Anything else in the marker column reads as Fahrenheit.
    assert_eq!(UnitSystem::from_status_char('4'), UnitSystem::Fahrenheit);
}
