//! Pretty and JSON renderings of command results.

use els_core::{FeedCatalog, FeedMode, SimReport, Status, StepTable};
use serde_json::{Value, json};

pub fn status_json(s: &Status) -> Value {
    json!({
        "position": s.position,
        "spindle_tick": s.spindle_tick,
        "spindle_rpm": s.spindle_rpm,
        "mode": s.mode.as_str(),
        "jog": s.jog.as_str(),
        "feed": s.feed.to_string(),
        "steps_per_rev": s.steps_per_rev,
        "fault": s.fault,
        "overruns": s.overruns,
        "limit_reached": s.limit_reached.map(|side| side.to_string()),
        "limits": { "left": s.limits.left, "right": s.limits.right },
        "feeding_in": s.feeding_in,
        "rpm_ceiling": s.rpm_ceiling,
        "over_speed": s.over_speed,
    })
}

pub fn status_line(s: &Status) -> String {
    let rpm = s
        .spindle_rpm
        .map_or_else(|| "stopped".to_string(), |r| format!("{r} rpm"));
    let mut line = format!(
        "pos {:>8}  spindle {:>9}  {:<10}  {}",
        s.position,
        rpm,
        s.mode.as_str(),
        s.feed
    );
    if let Some(side) = s.limit_reached {
        line.push_str(&format!("  [{side} limit]"));
    }
    if s.over_speed {
        line.push_str("  [over speed]");
    }
    if s.fault {
        line.push_str("  [FAULT]");
    }
    line
}

pub fn print_status(s: &Status, json: bool) {
    if json {
        println!("{}", status_json(s));
    } else {
        println!("{}", status_line(s));
    }
}

pub fn print_report(kind: &str, r: &SimReport, json: bool) {
    if json {
        let v = json!({
            "kind": kind,
            "ticks": r.ticks,
            "pulses": r.pulses,
            "elapsed_ms": r.elapsed_ns / 1_000_000,
            "status": status_json(&r.status),
        });
        println!("{v}");
    } else {
        println!(
            "{kind} complete: {} ticks, {} pulses in {:.3} s",
            r.ticks,
            r.pulses,
            r.elapsed_ns as f64 / 1e9
        );
        println!("{}", status_line(&r.status));
    }
}

pub fn print_table(t: &StepTable, entries: bool, json: bool) {
    if json {
        let mut v = json!({
            "feed": t.selection().to_string(),
            "steps_per_rev": t.total(),
            "max_steps": t.max_steps(),
            "period": t.period(),
            "rpm_ceiling": t.rpm_ceiling(),
        });
        if entries {
            v["entries"] = json!(t.entries());
        }
        println!("{v}");
        return;
    }
    println!("feed:          {}", t.selection());
    println!("steps/rev:     {}", t.total());
    println!("max steps/tick {}", t.max_steps());
    println!("step period:   {} counts", t.period());
    println!("safe up to:    {} rpm", t.rpm_ceiling());
    if entries {
        for (i, row) in t.entries().chunks(40).enumerate() {
            let cells: Vec<String> = row.iter().map(u8::to_string).collect();
            println!("{:>4}: {}", i * 40, cells.join(" "));
        }
    }
}

/// One line per catalog feed: the table it builds, or why it cannot.
pub fn print_feeds(
    catalog: &FeedCatalog,
    only: Option<FeedMode>,
    build: impl Fn(els_core::FeedSelection) -> eyre::Result<StepTable>,
    json: bool,
) {
    for sel in catalog.iter().filter(|s| only.is_none_or(|m| s.mode == m)) {
        let built = build(sel);
        if json {
            let v = match &built {
                Ok(t) => json!({
                    "feed": sel.to_string(),
                    "steps_per_rev": t.total(),
                    "max_steps": t.max_steps(),
                    "rpm_ceiling": t.rpm_ceiling(),
                }),
                Err(e) => json!({
                    "feed": sel.to_string(),
                    "error": crate::error_fmt::reason_name(e),
                }),
            };
            println!("{v}");
        } else {
            match &built {
                Ok(t) => println!(
                    "{:<18} {:>6} steps/rev  {:>2}/tick  safe to {:>4} rpm",
                    sel.to_string(),
                    t.total(),
                    t.max_steps(),
                    t.rpm_ceiling()
                ),
                Err(e) => println!("{:<18} unavailable: {e:#}", sel.to_string()),
            }
        }
    }
}
