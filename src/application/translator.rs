// Measurement translator - Raw performance data to translated metrics
use crate::application::metric_catalogue::{MetricCatalogue, Translation, CATCH_ALL};
use crate::domain::color::Color;
use crate::domain::error::GraphingError;
use crate::domain::metric::{
    rrd_name, MetricInfo, OriginalMetric, Scalars, TranslatedMetric, TranslatedMetrics,
};
use crate::domain::perf_data::RawSample;
use crate::domain::unit::{UnitInfo, COUNT_UNIT};
use std::collections::btree_map::Entry;

/// Translate one check's samples. Samples no rule matches are dropped; a
/// matched metric missing from the catalogue is a broken definition.
pub fn translate_metrics(
    samples: &[RawSample],
    check_command: &str,
    catalogue: &dyn MetricCatalogue,
) -> Result<TranslatedMetrics, GraphingError> {
    let mut translated = TranslatedMetrics::new();
    let mut auto_colors = 0;

    for sample in samples {
        let Some((translations, free_form)) = resolve_translations(&sample.name, check_command, catalogue)
        else {
            tracing::debug!(
                "Dropping sample {} of {}: no translation matches",
                sample.name,
                check_command
            );
            continue;
        };

        for translation in translations {
            if !(translation.scale.is_finite() && translation.scale > 0.0) {
                return Err(GraphingError::ConfigIntegrity(format!(
                    "translation of '{}' to '{}' has non-positive scale {}",
                    sample.name, translation.name, translation.scale
                )));
            }

            let original = OriginalMetric {
                name: rrd_name(&sample.name),
                scale: translation.scale,
            };

            match translated.entry(translation.name.clone()) {
                Entry::Occupied(mut entry) => {
                    tracing::debug!(
                        "Sample {} is another origin of metric {}",
                        sample.name,
                        translation.name
                    );
                    entry.get_mut().originals.push(original);
                }
                Entry::Vacant(entry) => {
                    let (info, unit) = if free_form {
                        let info = auto_metric_info(&translation.name, auto_colors);
                        auto_colors += 1;
                        (info, UnitInfo::count())
                    } else {
                        metadata(&translation.name, catalogue)?
                    };
                    entry.insert(build_metric(sample, &translation, info, unit, original));
                }
            }
        }
    }

    Ok(translated)
}

/// Metric metadata and unit for a canonical name, including `%d` families.
pub fn lookup_metric_info(catalogue: &dyn MetricCatalogue, name: &str) -> Option<MetricInfo> {
    if let Some(info) = catalogue.metric_info(name) {
        return Some(info.clone());
    }
    let (key, index) = family_key(name)?;
    catalogue.metric_info(&key).map(|info| MetricInfo {
        title: info.title.replace("%d", index),
        ..info.clone()
    })
}

/// `cpu_core_util_3` → (`cpu_core_util_%d`, `3`)
fn family_key(name: &str) -> Option<(String, &str)> {
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if prefix.is_empty() || prefix.len() == name.len() {
        return None;
    }
    Some((format!("{}%d", prefix), &name[prefix.len()..]))
}

/// Lookup order: check table, global table, catalogue identity, check
/// catch-all, free-form identity. The flag marks free-form results.
fn resolve_translations(
    name: &str,
    check_command: &str,
    catalogue: &dyn MetricCatalogue,
) -> Option<(Vec<Translation>, bool)> {
    let family = family_key(name);

    if let Some(translations) = declared_translations(name, family.as_ref(), |key| {
        catalogue.check_translations(check_command, key)
    }) {
        return Some((translations, false));
    }
    if let Some(translations) =
        declared_translations(name, family.as_ref(), |key| catalogue.global_translations(key))
    {
        return Some((translations, false));
    }

    let identity = vec![Translation {
        name: name.to_string(),
        scale: 1.0,
    }];
    if lookup_metric_info(catalogue, name).is_some() {
        return Some((identity, false));
    }
    if let Some(translations) = catalogue.check_translations(check_command, CATCH_ALL) {
        return Some((translations.to_vec(), false));
    }
    if catalogue.is_free_form(check_command) {
        return Some((identity, true));
    }
    None
}

fn declared_translations<'a>(
    name: &str,
    family: Option<&(String, &str)>,
    lookup: impl Fn(&str) -> Option<&'a [Translation]>,
) -> Option<Vec<Translation>> {
    if let Some(translations) = lookup(name) {
        return Some(translations.to_vec());
    }
    let (key, index) = family?;
    lookup(key.as_str()).map(|translations| instantiate(translations, index))
}

fn instantiate(translations: &[Translation], index: &str) -> Vec<Translation> {
    translations
        .iter()
        .map(|translation| Translation {
            name: translation.name.replace("%d", index),
            scale: translation.scale,
        })
        .collect()
}

fn metadata(
    name: &str,
    catalogue: &dyn MetricCatalogue,
) -> Result<(MetricInfo, UnitInfo), GraphingError> {
    let info = lookup_metric_info(catalogue, name).ok_or_else(|| {
        GraphingError::ConfigIntegrity(format!("no catalogue entry for metric '{}'", name))
    })?;
    let unit = catalogue.unit_info(&info.unit).cloned().ok_or_else(|| {
        GraphingError::ConfigIntegrity(format!(
            "metric '{}' uses unknown unit '{}'",
            name, info.unit
        ))
    })?;
    Ok((info, unit))
}

fn auto_metric_info(name: &str, color_index: usize) -> MetricInfo {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    let title = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    MetricInfo {
        title,
        unit: COUNT_UNIT.to_string(),
        color: Color::from_palette_index(color_index),
    }
}

fn build_metric(
    sample: &RawSample,
    translation: &Translation,
    info: MetricInfo,
    unit: UnitInfo,
    original: OriginalMetric,
) -> TranslatedMetric {
    let scale = translation.scale;
    TranslatedMetric {
        name: translation.name.clone(),
        title: info.title,
        value: sample.value * scale,
        scale,
        unit,
        color: info.color,
        scalars: Scalars {
            warn: sample.warn.map(|v| v * scale),
            crit: sample.crit.map(|v| v * scale),
            min: sample.min.map(|v| v * scale),
            max: sample.max.map(|v| v * scale),
        },
        originals: vec![original],
    }
}
