//! Human-readable error descriptions and structured JSON error formatting.

use els_core::error::{BuildError, ElsError};
use els_hardware::error::HwError;

/// Stable name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(e) = err.downcast_ref::<ElsError>() {
        return match e {
            ElsError::OverrunFault => "OverrunFault",
            ElsError::LimitReached(_) => "LimitReached",
            ElsError::InvalidCommand(_) => "InvalidCommand",
            ElsError::RatioOverflow { .. } => "RatioOverflow",
            ElsError::InvalidPitch(_) => "InvalidPitch",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    if err.downcast_ref::<HwError>().is_some() {
        return "Hardware";
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [machine], [timing], [jog] or [knob] sections.\nHow to fix: Edit the config file, then rerun. `els self-check` validates a config without moving anything."
        );
    }

    if let Some(e) = err.downcast_ref::<ElsError>() {
        return match e {
            ElsError::OverrunFault => format!(
                "What happened: Overrun fault: the leadscrew fell behind the spindle ({err}).\nLikely causes: Spindle faster than the safe speed for this feed, or a step period too long for the step count per tick.\nHow to fix: Slow the spindle or pick a finer feed, then acknowledge the fault. Re-tuning [periods] raises the safe speed."
            ),
            ElsError::LimitReached(side) => format!(
                "What happened: The {side} travel limit stopped the carriage.\nLikely causes: The move would run past a latched limit.\nHow to fix: Move away from the limit or clear it."
            ),
            ElsError::RatioOverflow { max_steps, ceiling } => format!(
                "What happened: The feed needs {max_steps} steps per spindle tick; the ceiling is {ceiling}.\nLikely causes: A coarse thread on a fine leadscrew or a high microstep setting.\nHow to fix: Choose a finer pitch, reduce machine.microsteps, or raise timing.max_steps_per_tick together with the [periods] table."
            ),
            ElsError::InvalidPitch(msg) => format!(
                "What happened: Invalid pitch ({msg}).\nLikely causes: A pitch that is not a positive decimal, or one too fine to produce a step per revolution.\nHow to fix: Use a value like 8, 11.5 or 1.25."
            ),
            ElsError::InvalidCommand(msg) => format!(
                "What happened: Command refused ({msg}).\nLikely causes: The controller is in a state where this command is not allowed.\nHow to fix: See logs for the current mode; re-run with --log-level=debug for more detail."
            ),
        };
    }

    if let Some(e) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: Hardware setup failed ({e}).\nLikely causes: Wrong [pins] numbers, GPIO not accessible, or pulse width too long for the step period.\nHow to fix: Check [pins] and [timing] in the config; ensure the process may access GPIO."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("pitch csv must have headers") {
        return "Invalid headers in pitch CSV. Expected 'mode,pitch'.".to_string();
    }

    if lower.contains("parse config") || lower.contains("read config") {
        return format!(
            "What happened: The config file could not be loaded.\nLikely causes: Missing file, TOML syntax error, or an unknown value.\nHow to fix: Check the path and syntax. Original: {msg}"
        );
    }

    if lower.contains(" must ") || lower.contains("not a positive decimal") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for controller faults; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ElsError>() {
        Some(ElsError::OverrunFault) => 3,
        Some(ElsError::LimitReached(_)) => 4,
        Some(ElsError::RatioOverflow { .. }) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let reason = reason_name(err);
    let details = match err.downcast_ref::<ElsError>() {
        Some(ElsError::RatioOverflow { max_steps, ceiling }) => {
            Some(json!({ "max_steps": max_steps, "ceiling": ceiling }))
        }
        Some(ElsError::LimitReached(side)) => Some(json!({ "side": side.to_string() })),
        _ => None,
    };
    let obj = if let Some(d) = details {
        json!({ "reason": reason, "details": d, "message": msg })
    } else {
        json!({ "reason": reason, "message": msg })
    };
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_explained_and_coded() {
        let err = eyre::Report::new(ElsError::RatioOverflow {
            max_steps: 13,
            ceiling: 11,
        })
        .wrap_err("feed diametral 8 dp");
        assert!(humanize(&err).contains("13 steps per spindle tick"));
        assert_eq!(exit_code_for_error(&err), 5);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "RatioOverflow");
        assert_eq!(v["details"]["ceiling"], 11);
    }

    #[test]
    fn config_messages_fall_into_the_config_bucket() {
        let err = eyre::eyre!("timing.step_period_min must be > timing.pulse_width_min");
        assert!(humanize(&err).starts_with("What happened: Configuration is invalid"));
        assert_eq!(exit_code_for_error(&err), 1);
        assert_eq!(reason_name(&err), "Error");
    }
}
