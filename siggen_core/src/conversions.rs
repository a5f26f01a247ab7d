//! Resolving `siggen_config` tables into engine specs.
//!
//! Unit names and command templates are checked here, once, so a bad table
//! fails at startup instead of on the first edit.

use siggen_config::{FeatureCfg, FieldCfg, FieldKind};

use crate::controller::FeatureSpec;
use crate::device::CommandTemplate;
use crate::error::EngineError;
use crate::field::{DerivedReadout, FieldSpec, ValueKind};
use crate::units::{UnitRegistry, UnitSpec};

// ── FieldSpec ────────────────────────────────────────────────────────────────

pub fn field_spec(cfg: &FieldCfg, units: &UnitRegistry) -> Result<FieldSpec, EngineError> {
    let label = cfg.label.clone().unwrap_or_else(|| cfg.id.clone());
    let command = CommandTemplate::parse_with_value(&cfg.command)?;
    let query = cfg
        .query
        .as_deref()
        .map(CommandTemplate::parse_without_value)
        .transpose()?;

    let (kind, initial_unit, initial_text) = match cfg.kind {
        FieldKind::Quantity => {
            let family_name = cfg
                .family
                .as_deref()
                .ok_or_else(|| EngineError::Config(format!("field '{}' has no unit family", cfg.id)))?;
            let family = units.family(family_name)?.clone();
            let unit = match cfg.unit.as_deref() {
                Some(u) => family.unit(u)?.clone(),
                None => family.base().clone(),
            };
            let text = cfg.default.clone().unwrap_or_else(|| "0".to_string());
            (ValueKind::Quantity(family), unit, text)
        }
        FieldKind::Choice => {
            let first = cfg
                .options
                .first()
                .ok_or_else(|| EngineError::Config(format!("field '{}' has no options", cfg.id)))?;
            let text = match cfg.default.as_deref() {
                // defaults may name the token; show the label
                Some(d) => cfg
                    .options
                    .iter()
                    .find(|o| o.label == d || o.token == d)
                    .map_or_else(|| d.to_string(), |o| o.label.clone()),
                None => first.label.clone(),
            };
            (
                ValueKind::Choice(cfg.options.clone()),
                UnitSpec::dimensionless(),
                text,
            )
        }
    };

    let derived = match &cfg.derived {
        Some(d) => Some(DerivedReadout {
            id: d.id.clone(),
            label: d.label.clone().unwrap_or_else(|| d.id.clone()),
            family: units.family(&d.family)?.clone(),
        }),
        None => None,
    };

    Ok(FieldSpec {
        id: cfg.id.clone(),
        label,
        kind,
        initial_unit,
        initial_text,
        command,
        query,
        min: cfg.min,
        max: cfg.max,
        integer: cfg.integer,
        min_decimals: cfg.min_decimals,
        derived,
    })
}

// ── FeatureSpec ──────────────────────────────────────────────────────────────

pub fn feature_spec(cfg: &FeatureCfg, units: &UnitRegistry) -> Result<FeatureSpec, EngineError> {
    let templates = |list: &[String]| {
        list.iter()
            .map(|s| CommandTemplate::parse_without_value(s))
            .collect::<Result<Vec<_>, _>>()
    };
    let fields = cfg
        .fields
        .iter()
        .map(|f| field_spec(f, units))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureSpec {
        name: cfg.name.clone(),
        label: cfg.label.clone().unwrap_or_else(|| cfg.name.clone()),
        activate: templates(&cfg.activate)?,
        deactivate: templates(&cfg.deactivate)?,
        state_query: CommandTemplate::parse_without_value(&cfg.state_query)?,
        active_token: cfg.active_token.clone(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst() -> FeatureCfg {
        siggen_config::builtin_features()
            .unwrap()
            .into_iter()
            .find(|f| f.name == "burst")
            .unwrap()
    }

    #[test]
    fn builtin_catalog_resolves() {
        let units = UnitRegistry::builtin();
        for cfg in siggen_config::builtin_features().unwrap() {
            feature_spec(&cfg, &units).unwrap_or_else(|e| panic!("{}: {e}", cfg.name));
        }
    }

    #[test]
    fn choice_default_is_shown_by_label() {
        let spec = feature_spec(&burst(), &UnitRegistry::builtin()).unwrap();
        let mode = spec.fields.iter().find(|f| f.id == "mode").unwrap();
        assert_eq!(mode.initial_text, "N cycle");
    }

    #[test]
    fn unknown_unit_is_a_config_error() {
        let mut cfg = burst();
        cfg.fields[1].unit = Some("furlongs".into());
        let err = feature_spec(&cfg, &UnitRegistry::builtin()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn value_slot_in_state_query_is_rejected() {
        let mut cfg = burst();
        cfg.state_query = "SOUR{ch}:BURS:STAT? {value}".into();
        assert!(feature_spec(&cfg, &UnitRegistry::builtin()).is_err());
    }
}
