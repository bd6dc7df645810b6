// Compiled metric operations, resolved against where values will be fetched
use super::expression::ConsolidationFunction;
use serde::{Deserialize, Serialize};

/// Identity of the monitored service whose round-robin archives hold the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub site: String,
    pub host_name: String,
    pub service_description: String,
}

impl SourceIdentity {
    pub fn new(
        site: impl Into<String>,
        host_name: impl Into<String>,
        service_description: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            host_name: host_name.into(),
            service_description: service_description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricOperation {
    Constant {
        value: f64,
    },
    RrdSource {
        site_id: String,
        host_name: String,
        service_name: String,
        metric_name: String,
        consolidation_func_name: Option<ConsolidationFunction>,
        scale: f64,
    },
    Operator {
        operator_name: String,
        operands: Vec<MetricOperation>,
    },
}

impl MetricOperation {
    pub fn rrd_source(
        source: &SourceIdentity,
        metric_name: impl Into<String>,
        consolidation_func_name: Option<ConsolidationFunction>,
        scale: f64,
    ) -> Self {
        MetricOperation::RrdSource {
            site_id: source.site.clone(),
            host_name: source.host_name.clone(),
            service_name: source.service_description.clone(),
            metric_name: metric_name.into(),
            consolidation_func_name,
            scale,
        }
    }

    pub fn operator(operator_name: impl Into<String>, operands: Vec<MetricOperation>) -> Self {
        MetricOperation::Operator {
            operator_name: operator_name.into(),
            operands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_tagged() {
        let operation = MetricOperation::operator(
            "-",
            vec![
                MetricOperation::rrd_source(
                    &SourceIdentity::new("site", "host", "Filesystem /"),
                    "fs_size",
                    Some(ConsolidationFunction::Max),
                    1048576.0,
                ),
                MetricOperation::Constant { value: 1.0 },
            ],
        );

        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json["type"], "operator");
        assert_eq!(json["operator_name"], "-");
        assert_eq!(json["operands"][0]["type"], "rrd_source");
        assert_eq!(json["operands"][0]["service_name"], "Filesystem /");
        assert_eq!(json["operands"][0]["consolidation_func_name"], "max");
        assert_eq!(json["operands"][1]["value"], 1.0);
    }
}
