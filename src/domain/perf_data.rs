// Performance data domain model and line parser
use serde::Serialize;

/// One `name=value;warn;crit;min;max` field of a performance-data line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSample {
    pub name: String,
    pub value: f64,
    pub unit_of_measure: String,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RawSample {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit_of_measure: String::new(),
            warn: None,
            crit: None,
            min: None,
            max: None,
        }
    }

    pub fn with_thresholds(
        mut self,
        warn: Option<f64>,
        crit: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        self.warn = warn;
        self.crit = crit;
        self.min = min;
        self.max = max;
        self
    }
}

const MGMT_PREFIX: &str = "check_mk-mgmt_";

/// Strip check arguments and collapse management-board variants onto the
/// plain check plugin name.
pub fn normalize_check_command(raw: &str) -> String {
    let command = raw.split('!').next().unwrap_or_default().trim();
    match command.strip_prefix(MGMT_PREFIX) {
        Some(plugin) => format!("check_mk-{}", plugin),
        None => command.to_string(),
    }
}

/// Parse a performance-data line. Malformed fields are skipped.
pub fn parse_perf_data(line: &str, check_command: &str) -> (Vec<RawSample>, String) {
    let samples = split_fields(line)
        .into_iter()
        .filter_map(|field| match parse_field(&field) {
            Some(sample) => Some(sample),
            None => {
                tracing::warn!("Skipping malformed performance data field: {}", field);
                None
            }
        })
        .collect();

    (samples, normalize_check_command(check_command))
}

/// Split on whitespace, keeping single-quoted names together.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }

    fields
}

fn parse_field(field: &str) -> Option<RawSample> {
    let (name, rest) = if let Some(quoted) = field.strip_prefix('\'') {
        let end = quoted.find('\'')?;
        let rest = quoted[end + 1..].strip_prefix('=')?;
        (quoted[..end].to_string(), rest)
    } else {
        let (name, rest) = field.split_once('=')?;
        (name.to_string(), rest)
    };

    if name.is_empty() {
        return None;
    }

    let mut parts = rest.split(';');
    let (value, unit_of_measure) = split_number(parts.next()?)?;
    let mut thresholds = parts.map(parse_threshold);

    Some(RawSample {
        name,
        value,
        unit_of_measure,
        warn: thresholds.next().flatten(),
        crit: thresholds.next().flatten(),
        min: thresholds.next().flatten(),
        max: thresholds.next().flatten(),
    })
}

/// Split `12.5ms` into `(12.5, "ms")`.
fn split_number(text: &str) -> Option<(f64, String)> {
    let text = text.trim().replace(',', ".");
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(text.len());
    let value = text[..end].parse::<f64>().ok().filter(|value| value.is_finite())?;
    Some((value, text[end..].to_string()))
}

/// Thresholds may be plain numbers or Nagios ranges; a range keeps its upper bound.
fn parse_threshold(text: &str) -> Option<f64> {
    let text = text.trim().trim_start_matches('@');
    if text.is_empty() {
        return None;
    }

    let bound = match text.split_once(':') {
        Some((lower, upper)) if upper.is_empty() => lower.trim_start_matches('~'),
        Some((_, upper)) => upper,
        None => text,
    };

    split_number(bound).map(|(value, _)| value)
}
