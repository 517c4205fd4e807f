use tokio::time::{Duration, Instant};

use crate::types::{Event, SetpointDirection, UnitSystem, ZoneState};

/// How long device-reported setpoints are ignored after a local change.
/// Protects an optimistic local value from being clobbered by a poll
/// response that was already in flight when the command went out.
const SETPOINT_LOCKOUT: Duration = Duration::from_secs(5);

/// Mutable state for a single HVAC zone.
///
/// Every `update_*` mutator applies the publish-on-change contract: it
/// returns `Some(Event)` only when the incoming value differs from the
/// stored one. `setpoint`/`setpoint_raw` and `temperature`/`temperature_raw`
/// always move together; the float is derived from the raw string.
pub(crate) struct Zone {
    uid: String,
    name: String,
    unit: Option<UnitSystem>,
    on_off: String,
    setpoint_raw: String,
    setpoint: f64,
    temperature_raw: String,
    temperature: f64,
    fan_speed: String,
    system_mode: String,
    demand: bool,
    lock_until: Option<Instant>,
}

impl Zone {
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            unit: None,
            on_off: String::new(),
            setpoint_raw: String::new(),
            setpoint: 0.0,
            temperature_raw: String::new(),
            temperature: 0.0,
            fan_speed: String::new(),
            system_mode: String::new(),
            demand: false,
            lock_until: None,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn set_unit(&mut self, unit: UnitSystem) {
        self.unit = Some(unit);
    }

    pub fn setpoint_raw(&self) -> &str {
        &self.setpoint_raw
    }

    pub fn update_on_off(&mut self, state: &str) -> Option<Event> {
        if state == self.on_off {
            return None;
        }
        self.on_off = state.to_string();
        Some(Event::ZonePowerChanged {
            uid: self.uid.clone(),
            name: self.name.clone(),
            on: state == "ON",
        })
    }

    pub fn update_fan_speed(&mut self, state: &str) -> Option<Event> {
        if state == self.fan_speed {
            return None;
        }
        self.fan_speed = state.to_string();
        Some(Event::ZoneFanSpeedChanged {
            uid: self.uid.clone(),
            name: self.name.clone(),
            speed: state.to_string(),
        })
    }

    pub fn update_system_mode(&mut self, state: &str) -> Option<Event> {
        if state == self.system_mode {
            return None;
        }
        self.system_mode = state.to_string();
        Some(Event::ZoneModeChanged {
            uid: self.uid.clone(),
            name: self.name.clone(),
            mode: state.to_string(),
        })
    }

    pub fn update_demand(&mut self, demand: bool) -> Option<Event> {
        if demand == self.demand {
            return None;
        }
        self.demand = demand;
        Some(Event::ZoneDemandChanged {
            uid: self.uid.clone(),
            name: self.name.clone(),
            demand,
        })
    }

    /// Apply a device-reported setpoint. Ignored entirely (not even compared)
    /// while the lockout window from a local change is open.
    pub fn update_setpoint(&mut self, raw: &str, value: f64) -> Option<Event> {
        if self.setpoint_locked() || raw == self.setpoint_raw {
            return None;
        }
        self.setpoint_raw = raw.to_string();
        self.setpoint = value;
        Some(self.setpoint_event())
    }

    pub fn update_temperature(&mut self, raw: &str, value: f64) -> Option<Event> {
        if raw == self.temperature_raw {
            return None;
        }
        self.temperature_raw = raw.to_string();
        self.temperature = value;
        Some(Event::ZoneTemperatureChanged {
            uid: self.uid.clone(),
            name: self.name.clone(),
            temperature: value,
            raw: raw.to_string(),
        })
    }

    /// Step the setpoint by one whole unit, optimistically. No-op until the
    /// first poll has established a real value. Arms (or extends) the
    /// lockout window.
    pub fn adjust_setpoint(&mut self, direction: SetpointDirection) -> Option<Event> {
        if self.setpoint == 0.0 {
            return None;
        }
        self.arm_lockout();
        self.setpoint += direction.delta();
        self.setpoint_raw = format_setpoint(self.setpoint);
        Some(self.setpoint_event())
    }

    /// Absolute setpoint in tenths of a degree (e.g. 725 → 72.5). Engages
    /// the same lockout as [`Zone::adjust_setpoint`].
    pub fn set_setpoint_direct(&mut self, tenths: u16) -> Event {
        self.arm_lockout();
        self.setpoint = f64::from(tenths) / 10.0;
        self.setpoint_raw = format_setpoint(self.setpoint);
        self.setpoint_event()
    }

    pub fn snapshot(&self) -> ZoneState {
        ZoneState {
            uid: self.uid.clone(),
            name: self.name.clone(),
            unit: self.unit,
            on: self.on_off == "ON",
            setpoint: self.setpoint,
            setpoint_raw: self.setpoint_raw.clone(),
            temperature: self.temperature,
            temperature_raw: self.temperature_raw.clone(),
            fan_speed: self.fan_speed.clone(),
            system_mode: self.system_mode.clone(),
            demand: self.demand,
        }
    }

    fn setpoint_event(&self) -> Event {
        Event::ZoneSetpointChanged {
            uid: self.uid.clone(),
            name: self.name.clone(),
            setpoint: self.setpoint,
            raw: self.setpoint_raw.clone(),
        }
    }

    fn arm_lockout(&mut self) {
        self.lock_until = Some(Instant::now() + SETPOINT_LOCKOUT);
    }

    fn setpoint_locked(&mut self) -> bool {
        match self.lock_until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                self.lock_until = None;
                false
            }
            None => false,
        }
    }
}

/// Fixed one-decimal setpoint representation, locale-independent.
fn format_setpoint(value: f64) -> String {
    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn polled_zone() -> Zone {
        let mut zone = Zone::new("Lobby", "L1.100");
        zone.set_unit(UnitSystem::Fahrenheit);
        zone.update_setpoint("62.4", 62.4);
        zone.update_temperature("80.6", 80.6);
        zone
    }

    #[test]
    fn mutators_publish_only_on_change() {
        let mut zone = Zone::new("Lobby", "L1.100");
        assert!(zone.update_on_off("ON").is_some());
        assert!(zone.update_on_off("ON").is_none());
        assert!(zone.update_on_off("OFF").is_some());

        assert!(zone.update_fan_speed("High").is_some());
        assert!(zone.update_fan_speed("High").is_none());

        assert!(zone.update_system_mode("Cool").is_some());
        assert!(zone.update_system_mode("Cool").is_none());

        assert!(zone.update_demand(true).is_some());
        assert!(zone.update_demand(true).is_none());

        assert!(zone.update_temperature("72.1", 72.1).is_some());
        assert!(zone.update_temperature("72.1", 72.1).is_none());
    }

    #[test]
    fn power_event_decodes_on_state() {
        let mut zone = Zone::new("Lobby", "L1.100");
        match zone.update_on_off("ON") {
            Some(Event::ZonePowerChanged { on, .. }) => assert!(on),
            other => panic!("expected ZonePowerChanged, got {other:?}"),
        }
        match zone.update_on_off("OFF") {
            Some(Event::ZonePowerChanged { on, .. }) => assert!(!on),
            other => panic!("expected ZonePowerChanged, got {other:?}"),
        }
    }

    #[test]
    fn adjust_is_noop_before_first_poll() {
        let mut zone = Zone::new("Lobby", "L1.100");
        assert!(zone.adjust_setpoint(SetpointDirection::Up).is_none());
        assert_eq!(zone.snapshot().setpoint, 0.0);
    }

    #[test]
    fn adjust_steps_by_one_and_reformats() {
        let mut zone = polled_zone();
        match zone.adjust_setpoint(SetpointDirection::Up) {
            Some(Event::ZoneSetpointChanged { setpoint, raw, .. }) => {
                assert!((setpoint - 63.4).abs() < 1e-9);
                assert_eq!(raw, "63.4");
            }
            other => panic!("expected ZoneSetpointChanged, got {other:?}"),
        }
        zone.adjust_setpoint(SetpointDirection::Down);
        zone.adjust_setpoint(SetpointDirection::Down);
        assert_eq!(zone.setpoint_raw(), "61.4");
    }

    #[tokio::test(start_paused = true)]
    async fn lockout_suppresses_device_setpoint_until_expiry() {
        let mut zone = polled_zone();
        zone.adjust_setpoint(SetpointDirection::Up);

        // Stale feedback inside the window is ignored outright.
        assert!(zone.update_setpoint("70.0", 70.0).is_none());
        assert_eq!(zone.setpoint_raw(), "63.4");

        time::advance(Duration::from_secs(6)).await;
        assert!(zone.update_setpoint("70.0", 70.0).is_some());
        assert_eq!(zone.setpoint_raw(), "70.0");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_adjust_extends_lockout() {
        let mut zone = polled_zone();
        zone.adjust_setpoint(SetpointDirection::Up);

        time::advance(Duration::from_secs(3)).await;
        zone.adjust_setpoint(SetpointDirection::Up);

        // 6s after the first adjustment but only 3s after the second.
        time::advance(Duration::from_secs(3)).await;
        assert!(zone.update_setpoint("70.0", 70.0).is_none());

        time::advance(Duration::from_secs(3)).await;
        assert!(zone.update_setpoint("70.0", 70.0).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn direct_setpoint_converts_tenths_and_locks() {
        let mut zone = polled_zone();
        match zone.set_setpoint_direct(725) {
            Event::ZoneSetpointChanged { setpoint, raw, .. } => {
                assert!((setpoint - 72.5).abs() < 1e-9);
                assert_eq!(raw, "72.5");
            }
            other => panic!("expected ZoneSetpointChanged, got {other:?}"),
        }
        assert!(zone.update_setpoint("68.0", 68.0).is_none());

        time::advance(Duration::from_secs(6)).await;
        assert!(zone.update_setpoint("68.0", 68.0).is_some());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut zone = polled_zone();
        zone.update_on_off("ON");
        zone.update_fan_speed("High");
        zone.update_system_mode("Cool");
        zone.update_demand(true);

        let state = zone.snapshot();
        assert_eq!(state.uid, "L1.100");
        assert_eq!(state.name, "Lobby");
        assert_eq!(state.unit, Some(UnitSystem::Fahrenheit));
        assert!(state.on);
        assert_eq!(state.setpoint_raw, "62.4");
        assert_eq!(state.temperature_raw, "80.6");
        assert_eq!(state.fan_speed, "High");
        assert_eq!(state.system_mode, "Cool");
        assert!(state.demand);
    }
}
