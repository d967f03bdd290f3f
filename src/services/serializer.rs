use crate::models::catalog::{catalog, is_under};
use crate::models::{ExportFormat, ExportJob, OptionError, OptionModel, OptionValue};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use std::fs;
use thiserror::Error;

/// Errors raised while turning an option model into processor configs
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid option value: {0}")]
    Invalid(#[from] OptionError),

    #[error("Required option {0} is not set")]
    MissingRequired(String),

    #[error("Config document is malformed: {0}")]
    Malformed(String),

    #[error("Failed to encode {format} config: {source}")]
    Encode {
        format: ExportFormat,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializes an [`OptionModel`] into the processor's JSON config documents.
///
/// # Document layout
///
/// - Every non-export section is emitted in catalog order as a nested object,
///   option keys verbatim and enum members as plain strings.
/// - `export` holds `"format": "<fmt>"` followed by that format's settings
///   subtree only. glb and gltf share `export.gltf`.
/// - Options the model does not hold take their catalog default. Required
///   options must be present in the model.
///
/// The serializer only reads the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigSerializer;

impl ConfigSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Check the model can be serialized at all
    pub fn check(&self, model: &OptionModel) -> Result<(), SchemaError> {
        model.validate()?;

        if let Some(missing) = catalog().required().find(|spec| model.get(&spec.path).is_none()) {
            return Err(SchemaError::MissingRequired(missing.path.clone()));
        }

        Ok(())
    }

    /// Build the config document for one format
    pub fn document(&self, model: &OptionModel, format: ExportFormat) -> Result<Value, SchemaError> {
        self.check(model)?;

        let mut root = Map::new();
        let export_prefix = format!("export.{}", format.settings_key());

        // Non-export sections first, in catalog order
        for spec in catalog().iter().filter(|s| s.section() != "export") {
            let value = model.get(&spec.path).cloned().unwrap_or_else(|| spec.default_value());
            insert_path(&mut root, &spec.path, to_json(&value));
        }

        let mut export = Map::new();
        export.insert("format".to_string(), Value::String(format.as_str().to_string()));
        root.insert("export".to_string(), Value::Object(export));

        for spec in catalog().under(&export_prefix) {
            let value = model.get(&spec.path).cloned().unwrap_or_else(|| spec.default_value());
            insert_path(&mut root, &spec.path, to_json(&value));
        }

        Ok(Value::Object(root))
    }

    /// Pretty-printed JSON text for one format
    pub fn render(&self, model: &OptionModel, format: ExportFormat) -> Result<String, SchemaError> {
        let document = self.document(model, format)?;
        serde_json::to_string_pretty(&document).map_err(|source| SchemaError::Encode { format, source })
    }

    /// Write every config the job needs.
    ///
    /// All documents are rendered before the first file is written, so a
    /// schema failure leaves no config behind. Existing files are overwritten.
    ///
    /// # Returns
    /// The written config paths in command order
    pub fn write_configs(&self, model: &OptionModel, job: &ExportJob) -> Result<Vec<Utf8PathBuf>, SchemaError> {
        let rendered = job
            .targets
            .iter()
            .map(|target| Ok((target.config_path.clone(), self.render(model, target.format)?)))
            .collect::<Result<Vec<_>, SchemaError>>()?;

        let mut written = Vec::with_capacity(rendered.len());
        for (path, text) in rendered {
            write_file(&path, &text)?;
            tracing::debug!("Wrote config: {}", path);
            written.push(path);
        }

        tracing::info!("Wrote {} config(s) for {}", written.len(), job.entry.file_name);
        Ok(written)
    }

    /// Rebuild an option model from a config document.
    ///
    /// The `export.format` marker is returned separately. The resulting model
    /// is validated against the catalog.
    pub fn parse_document(&self, document: &Value) -> Result<(OptionModel, Option<ExportFormat>), SchemaError> {
        let mut document = document.clone();
        let format = match document.pointer_mut("/export").and_then(Value::as_object_mut) {
            Some(export) => match export.remove("format") {
                Some(Value::String(name)) => Some(name.parse::<ExportFormat>().map_err(SchemaError::Malformed)?),
                Some(other) => return Err(SchemaError::Malformed(format!("export.format is {}", other))),
                None => None,
            },
            None => None,
        };

        let model: OptionModel =
            serde_json::from_value(document).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        model.validate()?;

        Ok((model, format))
    }
}

fn to_json(value: &OptionValue) -> Value {
    match value {
        OptionValue::Bool(b) => Value::Bool(*b),
        OptionValue::Int(i) => Value::from(*i),
        OptionValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        OptionValue::Enum(s) => Value::String(s.clone()),
        OptionValue::Section(section) => Value::Object(
            section
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let child = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match child {
            Value::Object(map) => map,
            // Catalog paths never nest below a leaf
            _ => return,
        };
    }
}

fn write_file(path: &Utf8Path, text: &str) -> Result<(), SchemaError> {
    fs::write(path, text).map_err(|source| SchemaError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// True when the option at `path` ends up in the document for `format`
pub fn emitted_for(path: &str, format: ExportFormat) -> bool {
    !is_under(path, "export") || is_under(path, &format!("export.{}", format.settings_key()))
}
