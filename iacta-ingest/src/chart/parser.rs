use super::{Arc, Chart, Event, TimingGroup};
use crate::error::ChartError;

/// Parse AFF text into a [`Chart`]
pub fn parse_chart(text: &str) -> Result<Chart, ChartError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    let mut headers = Vec::new();
    let mut terminated = false;
    for (line_no, line) in lines.by_ref() {
        if line.is_empty() {
            continue;
        }
        if line == "-" {
            terminated = true;
            break;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| ChartError::Syntax {
            line: line_no,
            message: format!("Expected 'Key:Value' header, got {:?}", line),
        })?;
        headers.push((key.trim().to_string(), value.trim().to_string()));
    }
    if !terminated {
        return Err(ChartError::MissingHeaderEnd);
    }

    let mut groups = vec![TimingGroup::default()];
    // Index into `groups` and opening line while inside a timinggroup block
    let mut open: Option<(usize, usize)> = None;

    for (line_no, line) in lines {
        if line.is_empty() {
            continue;
        }

        if line == "};" {
            if open.take().is_none() {
                return Err(syntax(line_no, "Unmatched '};'"));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("timinggroup") {
            if open.is_some() {
                return Err(syntax(line_no, "Nested timing groups are not allowed"));
            }
            let params = rest
                .strip_suffix('{')
                .map(str::trim)
                .and_then(|p| p.strip_prefix('('))
                .and_then(|p| p.strip_suffix(')'))
                .ok_or_else(|| syntax(line_no, "Malformed timinggroup header"))?;
            let params = params
                .split('_')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            groups.push(TimingGroup {
                params,
                events: Vec::new(),
            });
            open = Some((groups.len() - 1, line_no));
            continue;
        }

        let event = parse_event(line).map_err(|message| syntax(line_no, &message))?;
        let target = open.map(|(idx, _)| idx).unwrap_or(0);
        groups[target].events.push(event);
    }

    if let Some((_, opened_on)) = open {
        return Err(ChartError::UnclosedGroup(opened_on));
    }

    Ok(Chart { headers, groups })
}

fn syntax(line: usize, message: &str) -> ChartError {
    ChartError::Syntax {
        line,
        message: message.to_string(),
    }
}

fn parse_event(line: &str) -> Result<Event, String> {
    let body = line
        .strip_suffix(';')
        .ok_or_else(|| format!("Event must end with ';': {:?}", line))?
        .trim();

    let open = body
        .find('(')
        .ok_or_else(|| format!("Event has no argument list: {:?}", body))?;
    let close = body
        .find(')')
        .filter(|&c| c > open)
        .ok_or_else(|| format!("Unclosed argument list: {:?}", body))?;

    let name = body[..open].trim();
    let args: Vec<&str> = body[open + 1..close].split(',').map(str::trim).collect();
    let tail = body[close + 1..].trim();

    match name {
        "" => {
            let [time, lane] = fixed_args(&args, "tap")?;
            Ok(Event::Tap {
                time: int(time)?,
                lane: int(lane)?,
            })
        }
        "hold" => {
            let [start, end, lane] = fixed_args(&args, "hold")?;
            Ok(Event::Hold {
                start: int(start)?,
                end: int(end)?,
                lane: int(lane)?,
            })
        }
        "timing" => {
            let [time, bpm, beats] = fixed_args(&args, "timing")?;
            Ok(Event::Timing {
                time: int(time)?,
                bpm: float(bpm)?,
                beats: float(beats)?,
            })
        }
        "arc" => parse_arc(&args, tail).map(Event::Arc),
        _ => Ok(Event::Other(body.to_string())),
    }
}

fn parse_arc(args: &[&str], tail: &str) -> Result<Arc, String> {
    if args.len() != 10 && args.len() != 11 {
        return Err(format!("arc takes 10 or 11 arguments, got {}", args.len()));
    }

    let mut arctaps = Vec::new();
    if !tail.is_empty() {
        let inner = tail
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| format!("Malformed arctap list: {:?}", tail))?;
        for item in inner.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let time = item
                .strip_prefix("arctap(")
                .and_then(|t| t.strip_suffix(')'))
                .ok_or_else(|| format!("Malformed arctap: {:?}", item))?;
            arctaps.push(int(time)?);
        }
    }

    Ok(Arc {
        start: int(args[0])?,
        end: int(args[1])?,
        x_start: float(args[2])?,
        x_end: float(args[3])?,
        easing: args[4].to_string(),
        y_start: float(args[5])?,
        y_end: float(args[6])?,
        color: int(args[7])?,
        hitsound: args[8].to_string(),
        kind: args[9].to_string(),
        smoothness: args.get(10).map(|s| float(s)).transpose()?,
        arctaps,
    })
}

fn fixed_args<'a, const N: usize>(args: &[&'a str], name: &str) -> Result<[&'a str; N], String> {
    <[&str; N]>::try_from(args).map_err(|_| format!("{} takes {} arguments, got {}", name, N, args.len()))
}

fn int<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("Expected an integer, got {:?}", raw))
}

fn float(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Expected a number, got {:?}", raw))
}
