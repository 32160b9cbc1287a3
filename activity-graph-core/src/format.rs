//! Measure formatting for tooltips, table cells and y-axis ticks
//!
//! Long form is used wherever a single value is read; short form keeps axis
//! ticks narrow. Work durations are minutes with an 8-hour working day.

use crate::model::MetricType;
use crate::series::YValue;

const MINUTES_PER_HOUR: i64 = 60;
const HOURS_PER_DAY: i64 = 8;
const RATING_LETTERS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Long form of a value
pub fn format_measure(value: &YValue, metric_type: MetricType) -> String {
    format_value(value, metric_type, false)
}

/// Short form used for axis ticks
pub fn format_short_measure(value: &YValue, metric_type: MetricType) -> String {
    format_value(value, metric_type, true)
}

/// Y-axis tick formatter keyed by the charted metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickFormatter {
    metric_type: MetricType,
}

impl TickFormatter {
    pub fn new(metric_type: MetricType) -> Self {
        Self { metric_type }
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn format(&self, value: &YValue) -> String {
        format_short_measure(value, self.metric_type)
    }
}

fn format_value(value: &YValue, metric_type: MetricType, short: bool) -> String {
    match (value, metric_type) {
        (YValue::Code(code), MetricType::Rating) => rating_letter(code),
        (YValue::Number(n), MetricType::Rating) => rating_letter(&n.to_string()),
        (YValue::Code(code), _) => code.clone(),
        (YValue::Number(n), MetricType::Int) => {
            if short {
                compact(*n)
            } else {
                format!("{}", n.round() as i64)
            }
        }
        (YValue::Number(n), MetricType::Float) => format!("{:.1}", n),
        (YValue::Number(n), MetricType::Percent) => {
            if short {
                format!("{:.0}%", n)
            } else {
                format!("{:.1}%", n)
            }
        }
        (YValue::Number(n), MetricType::Millisec) => millis(*n),
        (YValue::Number(n), MetricType::WorkDur) => work_duration(n.round() as i64, short),
        (YValue::Number(n), MetricType::Level) => n.to_string(),
    }
}

fn rating_letter(code: &str) -> String {
    match code.trim().parse::<f64>() {
        Ok(n) if (1.0..=5.0).contains(&n) => RATING_LETTERS[(n.round() as usize) - 1].to_string(),
        _ => code.to_string(),
    }
}

fn compact(n: f64) -> String {
    let abs = n.abs();
    if abs >= 1_000_000.0 {
        trim_zero(format!("{:.1}", n / 1_000_000.0)) + "M"
    } else if abs >= 1_000.0 {
        trim_zero(format!("{:.1}", n / 1_000.0)) + "k"
    } else {
        format!("{}", n.round() as i64)
    }
}

fn trim_zero(s: String) -> String {
    match s.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => s,
    }
}

fn millis(n: f64) -> String {
    if n.abs() >= 1_000.0 {
        trim_zero(format!("{:.1}", n / 1_000.0)) + "s"
    } else {
        format!("{}ms", n.round() as i64)
    }
}

fn work_duration(minutes: i64, short: bool) -> String {
    if minutes == 0 {
        return "0".to_string();
    }
    let sign = if minutes < 0 { "-" } else { "" };
    let total = minutes.abs();
    let minutes_per_day = MINUTES_PER_HOUR * HOURS_PER_DAY;
    let days = total / minutes_per_day;
    let hours = (total % minutes_per_day) / MINUTES_PER_HOUR;
    let mins = total % MINUTES_PER_HOUR;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 && !(short && days > 0) {
        parts.push(format!("{}h", hours));
    }
    // minutes only when the duration is under a day
    if mins > 0 && days == 0 && !(short && hours > 0) {
        parts.push(format!("{}min", mins));
    }
    format!("{}{}", sign, parts.join(" "))
}
