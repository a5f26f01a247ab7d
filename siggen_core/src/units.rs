//! Unit registry: unit names, multipliers into a canonical base, auto-ranging.
//!
//! Every quantity is stored in its family's base unit (Hz, s, V, bit/s, ...).
//! Display units are chosen per value by [`UnitFamily::auto_range`], which
//! keeps the displayed magnitude inside `[RANGE_LOW, RANGE_HIGH)`.

use std::collections::BTreeMap;

use siggen_config::UnitRow;

use crate::error::EngineError;

/// Smallest displayed magnitude accepted by auto-ranging (inclusive).
pub const RANGE_LOW: f64 = 0.1;
/// Largest displayed magnitude accepted by auto-ranging (exclusive).
pub const RANGE_HIGH: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    pub name: String,
    pub multiplier_to_base: f64,
}

impl UnitSpec {
    pub fn new(name: impl Into<String>, multiplier_to_base: f64) -> Self {
        Self {
            name: name.into(),
            multiplier_to_base,
        }
    }

    /// Unit of a dimensionless value (choice indices, counts).
    pub fn dimensionless() -> Self {
        Self::new("", 1.0)
    }
}

#[inline]
pub fn to_base(value: f64, unit: &UnitSpec) -> f64 {
    value * unit.multiplier_to_base
}

#[inline]
pub fn from_base(value: f64, unit: &UnitSpec) -> f64 {
    value / unit.multiplier_to_base
}

/// Accept ASCII `u` and Greek mu for the micro sign.
fn micro_alias(name: &str) -> Option<String> {
    let rest = name
        .strip_prefix('u')
        .or_else(|| name.strip_prefix('\u{03bc}'))?;
    if rest.is_empty() {
        return None;
    }
    Some(format!("\u{00b5}{rest}"))
}

/// Units of one dimension, ordered by ascending multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFamily {
    name: String,
    units: Vec<UnitSpec>,
}

impl UnitFamily {
    pub fn new(name: impl Into<String>, mut units: Vec<UnitSpec>) -> Result<Self, EngineError> {
        let name = name.into();
        if units.is_empty() {
            return Err(EngineError::Config(format!("unit family '{name}' is empty")));
        }
        for u in &units {
            if !(u.multiplier_to_base.is_finite() && u.multiplier_to_base > 0.0) {
                return Err(EngineError::Config(format!(
                    "unit '{}' in family '{name}' needs a positive finite multiplier",
                    u.name
                )));
            }
        }
        units.sort_by(|a, b| a.multiplier_to_base.total_cmp(&b.multiplier_to_base));
        let mut seen: Vec<&str> = Vec::with_capacity(units.len());
        for u in &units {
            if seen.contains(&u.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate unit '{}' in family '{name}'",
                    u.name
                )));
            }
            seen.push(&u.name);
        }
        Ok(Self { name, units })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &[UnitSpec] {
        &self.units
    }

    pub fn unit_names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.name.clone()).collect()
    }

    pub fn smallest(&self) -> &UnitSpec {
        &self.units[0]
    }

    pub fn largest(&self) -> &UnitSpec {
        &self.units[self.units.len() - 1]
    }

    /// The unit with multiplier 1, or the smallest unit if the family has none.
    pub fn base(&self) -> &UnitSpec {
        self.units
            .iter()
            .find(|u| u.multiplier_to_base == 1.0)
            .unwrap_or_else(|| self.smallest())
    }

    pub fn find(&self, name: &str) -> Option<&UnitSpec> {
        let name = name.trim();
        self.units.iter().find(|u| u.name == name).or_else(|| {
            let alias = micro_alias(name)?;
            self.units.iter().find(|u| u.name == alias)
        })
    }

    pub fn unit(&self, name: &str) -> Result<&UnitSpec, EngineError> {
        self.find(name).ok_or_else(|| EngineError::UnknownUnit {
            family: self.name.clone(),
            unit: name.to_string(),
        })
    }

    /// Pick the first unit, ascending, whose displayed magnitude lies in
    /// `[RANGE_LOW, RANGE_HIGH)`.
    ///
    /// Zero, non-finite values and values below the family's range fall back
    /// to the smallest unit; values above it to the largest.
    pub fn auto_range(&self, value_in_base: f64) -> (f64, &UnitSpec) {
        if value_in_base == 0.0 || !value_in_base.is_finite() {
            let unit = self.smallest();
            let shown = if value_in_base.is_finite() {
                from_base(value_in_base, unit)
            } else {
                0.0
            };
            return (shown, unit);
        }
        for unit in &self.units {
            let shown = from_base(value_in_base, unit);
            if (RANGE_LOW..RANGE_HIGH).contains(&shown.abs()) {
                return (shown, unit);
            }
        }
        let smallest = self.smallest();
        if from_base(value_in_base, smallest).abs() < RANGE_LOW {
            (from_base(value_in_base, smallest), smallest)
        } else {
            let largest = self.largest();
            (from_base(value_in_base, largest), largest)
        }
    }
}

/// Named unit families. Unknown names are configuration errors.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    families: BTreeMap<String, UnitFamily>,
}

impl UnitRegistry {
    /// Families used by the built-in feature tables.
    pub fn builtin() -> Self {
        let table: [(&str, &[(&str, f64)]); 7] = [
            (
                "frequency",
                &[
                    ("\u{00b5}Hz", 1e-6),
                    ("mHz", 1e-3),
                    ("Hz", 1.0),
                    ("kHz", 1e3),
                    ("MHz", 1e6),
                ],
            ),
            (
                "time",
                &[
                    ("ps", 1e-12),
                    ("ns", 1e-9),
                    ("\u{00b5}s", 1e-6),
                    ("ms", 1e-3),
                    ("s", 1.0),
                ],
            ),
            ("voltage", &[("\u{00b5}V", 1e-6), ("mV", 1e-3), ("V", 1.0)]),
            ("bitrate", &[("bps", 1.0), ("kbps", 1e3), ("Mbps", 1e6)]),
            ("count", &[("", 1.0)]),
            ("phase", &[("\u{00b0}", 1.0)]),
            ("percent", &[("%", 1.0)]),
        ];
        let mut families = BTreeMap::new();
        for (name, units) in table {
            let units = units
                .iter()
                .map(|(n, m)| UnitSpec::new(*n, *m))
                .collect::<Vec<_>>();
            families.insert(
                name.to_string(),
                UnitFamily {
                    name: name.to_string(),
                    units,
                },
            );
        }
        Self { families }
    }

    pub fn insert(&mut self, family: UnitFamily) {
        self.families.insert(family.name.clone(), family);
    }

    /// Merge CSV rows into the registry. Rows for an existing family add units
    /// to it (or replace a unit of the same name).
    pub fn extend_from_rows(&mut self, rows: &[UnitRow]) -> Result<(), EngineError> {
        let mut grouped: BTreeMap<&str, Vec<UnitSpec>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.family.as_str())
                .or_default()
                .push(UnitSpec::new(row.name.clone(), row.multiplier));
        }
        for (family, added) in grouped {
            let mut units = self
                .families
                .get(family)
                .map(|f| f.units.clone())
                .unwrap_or_default();
            for unit in added {
                units.retain(|u| u.name != unit.name);
                units.push(unit);
            }
            self.insert(UnitFamily::new(family, units)?);
        }
        Ok(())
    }

    pub fn family(&self, name: &str) -> Result<&UnitFamily, EngineError> {
        self.families
            .get(name)
            .ok_or_else(|| EngineError::UnknownFamily(name.to_string()))
    }

    pub fn families(&self) -> impl Iterator<Item = &UnitFamily> {
        self.families.values()
    }

    pub fn unit(&self, family: &str, name: &str) -> Result<&UnitSpec, EngineError> {
        self.family(family)?.unit(name)
    }

    pub fn to_base(&self, value: f64, family: &str, unit: &str) -> Result<f64, EngineError> {
        Ok(to_base(value, self.unit(family, unit)?))
    }

    pub fn from_base(&self, value: f64, family: &str, unit: &str) -> Result<f64, EngineError> {
        Ok(from_base(value, self.unit(family, unit)?))
    }

    pub fn auto_range(&self, value: f64, family: &str) -> Result<(f64, UnitSpec), EngineError> {
        let (shown, unit) = self.family(family)?.auto_range(value);
        Ok((shown, unit.clone()))
    }
}
