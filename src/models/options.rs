use crate::models::catalog::catalog;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One sub-panel worth of options, keyed by option name.
pub type OptionSection = IndexMap<String, OptionValue>;

/// A single option value.
///
/// Nested sub-panels are represented by [`OptionValue::Section`], so a preset
/// file maps one-to-one onto the panel hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Enum(String),
    Section(OptionSection),
}

impl OptionValue {
    /// Short name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Float(_) => "float",
            OptionValue::Enum(_) => "enum",
            OptionValue::Section(_) => "section",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Enum(s) => write!(f, "{}", s),
            OptionValue::Section(s) => write!(f, "{{{} options}}", s.len()),
        }
    }
}

/// Errors raised when an option value does not fit its declaration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Option {path} expects a {expected} value, got {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Option {path} does not allow '{value}' (allowed: {allowed})")]
    NotAllowed {
        path: String,
        value: String,
        allowed: String,
    },

    #[error("Option {path} value {value} is outside {min}..={max}")]
    OutOfRange {
        path: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Option {path} cannot parse '{raw}'")]
    Unparseable { path: String, raw: String },

    #[error("Option path {0} conflicts with an existing value")]
    PathConflict(String),
}

/// Structured user settings grouped by section (`import`, `sceneGraph`, `edit`,
/// `culling`, `optimize`, `modifier`, `export`).
///
/// Options are addressed by dotted paths such as `sceneGraph.flatteningMethod`.
/// Every write through [`OptionModel::set`] is checked against the option catalog,
/// so a model built through the API always satisfies the enum and range invariants.
/// Models deserialized from presets must be checked with [`OptionModel::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionModel {
    sections: IndexMap<String, OptionSection>,
}

impl OptionModel {
    /// Create an empty model. Every option resolves to its catalog default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model holding every catalog option at its default value
    pub fn with_defaults() -> Self {
        let mut model = Self::new();
        for spec in catalog().iter() {
            let inserted = model.insert_unchecked(&spec.path, spec.default_value());
            debug_assert!(inserted.is_ok(), "catalog path {} overlaps another", spec.path);
        }
        model
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Names of the top-level sections currently holding values
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Look up a stored value by dotted path
    pub fn get(&self, path: &str) -> Option<&OptionValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut section = self.sections.get(first)?;
        let mut segments = segments.peekable();

        while let Some(segment) = segments.next() {
            let value = section.get(segment)?;
            if segments.peek().is_none() {
                return Some(value);
            }
            match value {
                OptionValue::Section(inner) => section = inner,
                _ => return None,
            }
        }
        None
    }

    /// Stored value, or the catalog default when the option was never set
    pub fn resolved(&self, path: &str) -> Option<OptionValue> {
        self.get(path)
            .cloned()
            .or_else(|| catalog().get(path).map(|spec| spec.default_value()))
    }

    /// Convenience accessor for boolean options (falls back to the default)
    pub fn flag(&self, path: &str) -> bool {
        self.resolved(path)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Convenience accessor for enum options (falls back to the default)
    pub fn choice(&self, path: &str) -> Option<String> {
        self.resolved(path)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Set an option after validating it against the catalog.
    ///
    /// Integers are accepted for float options and stored as floats.
    /// Returns the previous value, if any.
    pub fn set(&mut self, path: &str, value: OptionValue) -> Result<Option<OptionValue>, OptionError> {
        let spec = catalog()
            .get(path)
            .ok_or_else(|| OptionError::UnknownOption(path.to_string()))?;
        let value = spec.check(&value)?;
        self.insert_unchecked(path, value)
    }

    /// Parse a textual value (`true`, `42`, `0.5`, `byOpacity`) and set it
    pub fn set_raw(&mut self, path: &str, raw: &str) -> Result<Option<OptionValue>, OptionError> {
        let spec = catalog()
            .get(path)
            .ok_or_else(|| OptionError::UnknownOption(path.to_string()))?;
        let value = spec.parse(raw)?;
        self.insert_unchecked(path, value)
    }

    /// Remove an option. Empty parent sections are pruned.
    pub fn remove(&mut self, path: &str) -> Option<OptionValue> {
        let segments: Vec<&str> = path.split('.').collect();
        let (first, rest) = segments.split_first()?;
        let section = self.sections.get_mut(*first)?;
        let removed = remove_in(section, rest);
        if section.is_empty() {
            self.sections.shift_remove(*first);
        }
        removed
    }

    /// Drop every stored value ("Reset")
    pub fn clear(&mut self) {
        self.sections.clear();
    }

    /// All stored leaf values with their dotted paths, in insertion order
    pub fn leaves(&self) -> Vec<(String, &OptionValue)> {
        let mut out = Vec::new();
        for (name, section) in &self.sections {
            collect_leaves(name, section, &mut out);
        }
        out
    }

    /// Check every stored value against the catalog, collecting all problems
    pub fn validation_errors(&self) -> Vec<OptionError> {
        let mut errors = Vec::new();
        for (path, value) in self.leaves() {
            match catalog().get(&path) {
                Some(spec) => {
                    if let Err(e) = spec.check(value) {
                        errors.push(e);
                    }
                }
                None => errors.push(OptionError::UnknownOption(path)),
            }
        }
        errors
    }

    /// Check every stored value against the catalog, stopping at the first problem
    pub fn validate(&self) -> Result<(), OptionError> {
        match self.validation_errors().into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn insert_unchecked(&mut self, path: &str, value: OptionValue) -> Result<Option<OptionValue>, OptionError> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(OptionError::UnknownOption(path.to_string()));
        };
        let Some((first, middle)) = parents.split_first() else {
            // A bare key has no section to live in
            return Err(OptionError::UnknownOption(path.to_string()));
        };

        let mut section = self.sections.entry(first.to_string()).or_default();
        for segment in middle {
            let entry = section
                .entry(segment.to_string())
                .or_insert_with(|| OptionValue::Section(OptionSection::new()));
            section = match entry {
                OptionValue::Section(inner) => inner,
                _ => return Err(OptionError::PathConflict(path.to_string())),
            };
        }

        if matches!(section.get(*last), Some(OptionValue::Section(_))) {
            return Err(OptionError::PathConflict(path.to_string()));
        }
        Ok(section.insert(last.to_string(), value))
    }
}

fn remove_in(section: &mut OptionSection, segments: &[&str]) -> Option<OptionValue> {
    match segments {
        [] => None,
        [last] => section.shift_remove(*last),
        [head, tail @ ..] => {
            let OptionValue::Section(inner) = section.get_mut(*head)? else {
                return None;
            };
            let removed = remove_in(inner, tail);
            if inner.is_empty() {
                section.shift_remove(*head);
            }
            removed
        }
    }
}

fn collect_leaves<'a>(prefix: &str, section: &'a OptionSection, out: &mut Vec<(String, &'a OptionValue)>) {
    for (key, value) in section {
        let path = format!("{}.{}", prefix, key);
        match value {
            OptionValue::Section(inner) => collect_leaves(&path, inner, out),
            leaf => out.push((path, leaf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_model_is_empty() {
        let model = OptionModel::new();
        assert!(model.is_empty());
        assert!(model.get("sceneGraph.flatteningMethod").is_none());
        // Resolution still falls back to defaults
        assert_eq!(
            model.resolved("sceneGraph.flatteningMethod"),
            Some(OptionValue::Enum("byOpacity".to_string()))
        );
    }

    #[test]
    fn test_set_and_get_nested() {
        let mut model = OptionModel::new();
        model
            .set("optimize.mesh.decimator.method", OptionValue::Enum("sutaric".into()))
            .unwrap();

        assert_eq!(
            model.get("optimize.mesh.decimator.method"),
            Some(&OptionValue::Enum("sutaric".into()))
        );
        assert!(matches!(model.get("optimize.mesh"), Some(OptionValue::Section(_))));
    }

    #[test]
    fn test_set_rejects_value_outside_allowed_set() {
        let mut model = OptionModel::new();
        let err = model
            .set("sceneGraph.flatteningMethod", OptionValue::Enum("byColor".into()))
            .unwrap_err();

        assert!(matches!(err, OptionError::NotAllowed { .. }));
        assert!(model.get("sceneGraph.flatteningMethod").is_none());
    }

    #[test]
    fn test_set_rejects_unknown_and_mistyped() {
        let mut model = OptionModel::new();
        assert!(matches!(
            model.set("sceneGraph.colour", OptionValue::Bool(true)),
            Err(OptionError::UnknownOption(_))
        ));
        assert!(matches!(
            model.set("sceneGraph.preserveDepthLevel", OptionValue::Enum("deep".into())),
            Err(OptionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            model.set("sceneGraph.preserveDepthLevel", OptionValue::Int(21)),
            Err(OptionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_int_is_widened_for_float_options() {
        let mut model = OptionModel::new();
        model
            .set("edit.normals.hardAngleThreshold", OptionValue::Int(45))
            .unwrap();
        assert_eq!(
            model.get("edit.normals.hardAngleThreshold"),
            Some(&OptionValue::Float(45.0))
        );
    }

    #[test]
    fn test_set_raw_parses_by_kind() {
        let mut model = OptionModel::new();
        model.set_raw("culling.occlusion.enabled", "on").unwrap();
        model.set_raw("modifier.sizeOnScreen.pixelTarget", "512.5").unwrap();
        model.set_raw("optimize.mesh.remesher.method", "shrinkwrap").unwrap();

        assert!(model.flag("culling.occlusion.enabled"));
        assert_eq!(
            model.get("modifier.sizeOnScreen.pixelTarget"),
            Some(&OptionValue::Float(512.5))
        );
        assert_eq!(
            model.choice("optimize.mesh.remesher.method").as_deref(),
            Some("shrinkwrap")
        );
        assert!(model.set_raw("culling.occlusion.enabled", "maybe").is_err());
    }

    #[test]
    fn test_remove_prunes_empty_sections() {
        let mut model = OptionModel::new();
        model.set_raw("modifier.sizeOnScreen.powerOfTwoResolution", "auto").unwrap();

        let removed = model.remove("modifier.sizeOnScreen.powerOfTwoResolution");
        assert_eq!(removed, Some(OptionValue::Enum("auto".into())));
        assert!(model.is_empty());
    }

    #[test]
    fn test_with_defaults_is_valid() {
        let model = OptionModel::with_defaults();
        assert!(model.validation_errors().is_empty());
        assert_eq!(model.leaves().len(), catalog().len());
    }

    #[test]
    fn test_catalog_paths_never_nest() {
        for spec in catalog().iter() {
            let prefix = format!("{}.", spec.path);
            assert!(
                catalog().iter().all(|other| !other.path.starts_with(&prefix)),
                "{} is both a value and a section",
                spec.path
            );
        }
    }

    #[test]
    fn test_validation_catches_bad_preset_values() {
        let yaml = "sceneGraph:\n  flatteningMethod: byColor\n  bogus: 1\n";
        let model: OptionModel = serde_yaml_ng::from_str(yaml).unwrap();

        let errors = model.validation_errors();
        assert_eq!(errors.len(), 2);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_yaml_value_types_survive() {
        let mut model = OptionModel::new();
        model.set_raw("import.quickPreset.polyCount", "15000").unwrap();
        model.set_raw("optimize.mesh.decimator.boundaryPreservationFactor", "0.25").unwrap();
        model.set_raw("export.fbx.preferBinary", "false").unwrap();

        let yaml = serde_yaml_ng::to_string(&model).unwrap();
        let loaded: OptionModel = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(loaded, model);
    }
}
