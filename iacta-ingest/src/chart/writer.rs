use super::{Arc, Chart, Event};
use std::fmt::Write;

/// Serialize a chart canonically: two-decimal floats, two-space group indent
pub fn write_chart(chart: &Chart) -> String {
    let mut out = String::new();
    for (key, value) in &chart.headers {
        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push_str("-\n");

    for (i, group) in chart.groups.iter().enumerate() {
        if i == 0 {
            for event in &group.events {
                out.push_str(&format_event(event));
                out.push_str(";\n");
            }
            continue;
        }

        out.push_str("timinggroup(");
        out.push_str(&group.params.join("_"));
        out.push_str("){\n");
        for event in &group.events {
            out.push_str("  ");
            out.push_str(&format_event(event));
            out.push_str(";\n");
        }
        out.push_str("};\n");
    }
    out
}

fn format_event(event: &Event) -> String {
    match event {
        Event::Timing { time, bpm, beats } => format!("timing({},{:.2},{:.2})", time, bpm, beats),
        Event::Tap { time, lane } => format!("({},{})", time, lane),
        Event::Hold { start, end, lane } => format!("hold({},{},{})", start, end, lane),
        Event::Arc(arc) => format_arc(arc),
        Event::Other(raw) => raw.clone(),
    }
}

fn format_arc(arc: &Arc) -> String {
    let mut s = format!(
        "arc({},{},{:.2},{:.2},{},{:.2},{:.2},{},{},{}",
        arc.start,
        arc.end,
        arc.x_start,
        arc.x_end,
        arc.easing,
        arc.y_start,
        arc.y_end,
        arc.color,
        arc.hitsound,
        arc.kind
    );
    if let Some(smoothness) = arc.smoothness {
        let _ = write!(s, ",{:.2}", smoothness);
    }
    s.push(')');

    if !arc.arctaps.is_empty() {
        let taps: Vec<String> = arc.arctaps.iter().map(|t| format!("arctap({})", t)).collect();
        let _ = write!(s, "[{}]", taps.join(","));
    }
    s
}
