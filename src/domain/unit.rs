// Unit metadata and value rendering
use serde::{Deserialize, Serialize};

pub const COUNT_UNIT: &str = "count";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    Decimal,
    IecBytes,
    Percentage,
    Seconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub symbol: String,
    pub render: RenderKind,
}

const IEC_PREFIXES: &[&str] = &["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

impl UnitInfo {
    /// The dimensionless fallback unit used for constants and free-form metrics.
    pub fn count() -> Self {
        Self {
            id: COUNT_UNIT.to_string(),
            title: "Count".to_string(),
            symbol: String::new(),
            render: RenderKind::Decimal,
        }
    }

    pub fn render(&self, value: f64) -> String {
        match self.render {
            RenderKind::Decimal => self.with_symbol(format!("{:.2}", value)),
            RenderKind::Percentage => format!("{:.2}%", value),
            RenderKind::IecBytes => {
                let mut scaled = value;
                let mut exponent = 0;
                while scaled.abs() >= 1024.0 && exponent < IEC_PREFIXES.len() - 1 {
                    scaled /= 1024.0;
                    exponent += 1;
                }
                format!("{:.2} {}{}", scaled, IEC_PREFIXES[exponent], self.symbol)
            }
            RenderKind::Seconds => {
                let magnitude = value.abs();
                if magnitude < 1.0 {
                    format!("{:.2} ms", value * 1000.0)
                } else if magnitude < 60.0 {
                    format!("{:.2} s", value)
                } else if magnitude < 3600.0 {
                    format!("{:.2} min", value / 60.0)
                } else if magnitude < 86400.0 {
                    format!("{:.2} h", value / 3600.0)
                } else {
                    format!("{:.2} d", value / 86400.0)
                }
            }
        }
    }

    fn with_symbol(&self, number: String) -> String {
        if self.symbol.is_empty() {
            number
        } else {
            format!("{} {}", number, self.symbol)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(render: RenderKind, symbol: &str) -> UnitInfo {
        UnitInfo {
            id: "u".to_string(),
            title: String::new(),
            symbol: symbol.to_string(),
            render,
        }
    }

    #[test]
    fn test_render_bytes() {
        let bytes = unit(RenderKind::IecBytes, "B");
        assert_eq!(bytes.render(512.0), "512.00 B");
        assert_eq!(bytes.render(1048576.0 * 1.5), "1.50 MiB");
    }

    #[test]
    fn test_render_other_kinds() {
        assert_eq!(UnitInfo::count().render(3.0), "3.00");
        assert_eq!(unit(RenderKind::Decimal, "V").render(230.0), "230.00 V");
        assert_eq!(unit(RenderKind::Percentage, "%").render(42.5), "42.50%");
        assert_eq!(unit(RenderKind::Seconds, "s").render(0.25), "250.00 ms");
        assert_eq!(unit(RenderKind::Seconds, "s").render(7200.0), "2.00 h");
    }
}
