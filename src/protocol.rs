use tracing::debug;

use crate::registry::ZoneRegistry;
use crate::types::{Event, FanSpeed, SystemMode, UnitSystem};

/// Broadcast status request: one response line per zone, no UID argument.
pub(crate) const POLL_COMMAND: &str = "ls2";

// -- Outbound command builders (no terminator; the queue frames them) --

pub(crate) fn power_command(uid: &str, on: bool) -> String {
    format!("{} {uid}", if on { "on" } else { "off" })
}

pub(crate) fn mode_command(uid: &str, mode: SystemMode) -> String {
    format!("{} {uid}", mode.as_token())
}

pub(crate) fn fan_speed_command(uid: &str, speed: FanSpeed) -> String {
    format!("fspeed {uid} {}", speed.as_token())
}

pub(crate) fn setpoint_command(uid: &str, value: &str) -> String {
    format!("temp {uid} {value}")
}

// -- Inbound status parsing --

/// One decoded status line. Field slices borrow from the input; numeric
/// fields are validated here so a malformed line never applies a partial
/// update downstream.
struct StatusLine<'a> {
    uid: &'a str,
    unit: UnitSystem,
    on_off: &'a str,
    setpoint_raw: &'a str,
    setpoint: f64,
    temperature_raw: &'a str,
    temperature: f64,
    fan_speed: &'a str,
    system_mode: &'a str,
    demand: bool,
}

/// Decode a raw response chunk and route each status line into the matching
/// registry zone, collecting the resulting change events.
///
/// Lines are CR-delimited; a bare LF line is skipped and a leading LF is
/// stripped. Only lines containing the `"L"` token are status lines —
/// acknowledgements and the `>` prompt fall through silently. Lines for
/// unregistered UIDs are dropped without diagnostics; malformed status
/// lines (too short, non-numeric data in a numeric window) are dropped
/// with a debug log and never crash the read loop.
pub(crate) fn parse_feedback(chunk: &str, registry: &mut ZoneRegistry) -> Vec<Event> {
    let mut events = Vec::new();

    for line in chunk.split('\r') {
        if line == "\n" {
            continue;
        }
        let line = line.strip_prefix('\n').unwrap_or(line);
        // The bridge's `>` prompt carries no terminator of its own, so it
        // can lead the next line after reassembly.
        let line = line.trim_start_matches('>');
        if !line.contains('L') {
            continue;
        }

        let Some(status) = parse_status_line(line) else {
            debug!(line, "dropping malformed status line");
            continue;
        };
        let Some(zone) = registry.get_mut(status.uid) else {
            continue;
        };

        zone.set_unit(status.unit);
        events.extend(zone.update_on_off(status.on_off));
        events.extend(zone.update_setpoint(status.setpoint_raw, status.setpoint));
        events.extend(zone.update_temperature(status.temperature_raw, status.temperature));
        events.extend(zone.update_fan_speed(status.fan_speed));
        events.extend(zone.update_system_mode(status.system_mode));
        events.extend(zone.update_demand(status.demand));
    }

    events
}

/// Field windows per the manufacturer's response grammar. The unit marker at
/// offset 15 selects the layout; offsets below it are shared.
fn parse_status_line(line: &str) -> Option<StatusLine<'_>> {
    let uid = line.get(0..6)?;
    let on_off = line.get(7..10)?.trim();
    let unit = UnitSystem::from_status_char(*line.as_bytes().get(15)? as char);

    let (setpoint_raw, temperature_raw, fan_speed, system_mode, demand_at) = match unit {
        UnitSystem::Fahrenheit => (
            line.get(11..16)?,
            line.get(18..23)?,
            line.get(25..29)?,
            line.get(30..34)?,
            42,
        ),
        UnitSystem::Celsius => (
            line.get(11..15)?,
            line.get(17..21)?,
            line.get(23..27)?,
            line.get(38..42)?,
            40,
        ),
    };

    let setpoint_raw = setpoint_raw.trim_start_matches('0');
    let temperature_raw = temperature_raw.trim_start_matches('0');

    Some(StatusLine {
        uid,
        unit,
        on_off,
        setpoint_raw,
        setpoint: setpoint_raw.parse().ok()?,
        temperature_raw,
        temperature: temperature_raw.parse().ok()?,
        fan_speed: fan_speed.trim(),
        system_mode: system_mode.trim(),
        demand: *line.as_bytes().get(demand_at)? == b'1',
    })
}
