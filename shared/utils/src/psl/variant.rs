//! Format variants
//!
//! A variant is the static configuration that adapts the hierarchy builder to
//! one export format: metadata labels, owner templates, required columns,
//! identity candidates and the names of the fields the builder reads.
//! Specialised variants are expressed as overrides merged over a base.

use indexmap::IndexMap;
use psl_models::DomainTag;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use validator::{Validate, ValidationError};

use super::template::placeholder_arity;
use crate::error::{PslError, PslResult};
use crate::validation::validate_model;

/// Candidate rule for values without provenance: parent identities and owner metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSpec {
    pub template: String,
    pub fields: Vec<String>,
}

/// Candidate rule for entity identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentSpec {
    pub template: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub domain: Option<DomainTag>,
}

impl ParseSpec {
    pub fn new(template: &str, fields: &[&str]) -> Self {
        Self {
            template: template.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl IdentSpec {
    pub fn new(template: &str, fields: &[&str], domain: Option<DomainTag>) -> Self {
        Self {
            template: template.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            domain,
        }
    }
}

/// How many entities a row expands into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityMode {
    /// Every row yields exactly one entity
    Fixed,
    /// Quantity read from the named column
    Column(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    pub delimiter: char,
    pub quote: char,
    /// Strip whitespace around fields
    pub trim: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            trim: true,
        }
    }
}

impl Dialect {
    /// Reader builder for this dialect. Records are read without a header
    /// row since the metadata block precedes the column header.
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter as u8)
            .quote(self.quote as u8)
            .trim(if self.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            });
        builder
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FormatVariant {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(custom = "validate_dialect")]
    pub dialect: Dialect,
    #[validate(length(min = 1))]
    pub meta_labels: Vec<String>,
    #[validate(length(min = 1), custom = "validate_parse_specs")]
    pub owner_ident: Vec<ParseSpec>,
    #[validate(custom = "validate_parse_specs")]
    pub owner_description: Vec<ParseSpec>,
    #[validate(length(min = 1))]
    pub required_columns: Vec<String>,
    #[validate(length(min = 1), custom = "validate_ident_specs")]
    pub ident_specs: Vec<IdentSpec>,
    #[validate(length(min = 1), custom = "validate_parse_specs")]
    pub parent_specs: Vec<ParseSpec>,
    #[validate(length(min = 1))]
    pub level_field: String,
    #[validate(custom = "validate_quantity")]
    pub quantity: QuantityMode,
    #[validate(length(min = 1))]
    pub refdes_field: String,
    #[validate(length(min = 1))]
    pub description_field: String,
    #[validate(length(min = 1))]
    pub type_field: String,
    #[validate(length(min = 1))]
    pub assembly_marker: String,
    #[validate(length(min = 1))]
    pub part_marker: String,
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

fn validate_dialect(dialect: &Dialect) -> Result<(), ValidationError> {
    if !dialect.delimiter.is_ascii() || !dialect.quote.is_ascii() {
        return Err(invalid(
            "dialect",
            "delimiter and quote must be single-byte ASCII characters".to_string(),
        ));
    }
    if dialect.delimiter == dialect.quote {
        return Err(invalid(
            "dialect",
            "delimiter and quote must differ".to_string(),
        ));
    }
    Ok(())
}

fn check_template(template: &str, fields: &[String]) -> Result<(), ValidationError> {
    let arity = placeholder_arity(template);
    if arity > fields.len() {
        return Err(invalid(
            "template",
            format!(
                "template '{}' needs {} fields but {} given",
                template,
                arity,
                fields.len()
            ),
        ));
    }
    Ok(())
}

fn validate_parse_specs(specs: &[ParseSpec]) -> Result<(), ValidationError> {
    specs
        .iter()
        .try_for_each(|spec| check_template(&spec.template, &spec.fields))
}

fn validate_ident_specs(specs: &[IdentSpec]) -> Result<(), ValidationError> {
    specs
        .iter()
        .try_for_each(|spec| check_template(&spec.template, &spec.fields))
}

fn validate_quantity(mode: &QuantityMode) -> Result<(), ValidationError> {
    match mode {
        QuantityMode::Column(field) if field.trim().is_empty() => Err(invalid(
            "quantity",
            "quantity column name must not be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl FormatVariant {
    /// Plain lower-case export: `level,parent,refdes,description,type,qty`
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            dialect: Dialect::default(),
            meta_labels: strings(&["ident", "revision", "description"]),
            owner_ident: vec![ParseSpec::new("{}r{}", &["ident", "revision"])],
            owner_description: vec![ParseSpec::new("{}", &["description"])],
            required_columns: strings(&["level", "parent", "refdes", "description", "type", "qty"]),
            ident_specs: vec![
                IdentSpec::new("{}", &["ident"], None),
                IdentSpec::new("{}", &["refdes"], None),
            ],
            parent_specs: vec![ParseSpec::new("{}", &["parent"])],
            level_field: "level".to_string(),
            quantity: QuantityMode::Column("qty".to_string()),
            refdes_field: "refdes".to_string(),
            description_field: "description".to_string(),
            type_field: "type".to_string(),
            assembly_marker: "Assembly".to_string(),
            part_marker: "Part".to_string(),
        }
    }

    pub fn validate_config(&self) -> PslResult<()> {
        validate_model(self).map_err(|e| match e {
            PslError::Configuration { message } => {
                PslError::configuration(format!("variant '{}': {}", self.name, message))
            }
            other => other,
        })
    }

    pub fn expands_quantity(&self) -> bool {
        matches!(self.quantity, QuantityMode::Column(_))
    }
}

/// Field-by-field override applied on top of a base variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantOverride {
    pub dialect: Option<Dialect>,
    pub meta_labels: Option<Vec<String>>,
    pub owner_ident: Option<Vec<ParseSpec>>,
    pub owner_description: Option<Vec<ParseSpec>>,
    pub required_columns: Option<Vec<String>>,
    pub ident_specs: Option<Vec<IdentSpec>>,
    pub parent_specs: Option<Vec<ParseSpec>>,
    pub level_field: Option<String>,
    pub quantity: Option<QuantityMode>,
    pub refdes_field: Option<String>,
    pub description_field: Option<String>,
    pub type_field: Option<String>,
    pub assembly_marker: Option<String>,
    pub part_marker: Option<String>,
}

impl VariantOverride {
    pub fn apply(&self, base: &FormatVariant, name: &str) -> FormatVariant {
        fn pick<T: Clone>(over: &Option<T>, base: &T) -> T {
            over.as_ref().unwrap_or(base).clone()
        }

        FormatVariant {
            name: name.to_string(),
            dialect: pick(&self.dialect, &base.dialect),
            meta_labels: pick(&self.meta_labels, &base.meta_labels),
            owner_ident: pick(&self.owner_ident, &base.owner_ident),
            owner_description: pick(&self.owner_description, &base.owner_description),
            required_columns: pick(&self.required_columns, &base.required_columns),
            ident_specs: pick(&self.ident_specs, &base.ident_specs),
            parent_specs: pick(&self.parent_specs, &base.parent_specs),
            level_field: pick(&self.level_field, &base.level_field),
            quantity: pick(&self.quantity, &base.quantity),
            refdes_field: pick(&self.refdes_field, &base.refdes_field),
            description_field: pick(&self.description_field, &base.description_field),
            type_field: pick(&self.type_field, &base.type_field),
            assembly_marker: pick(&self.assembly_marker, &base.assembly_marker),
            part_marker: pick(&self.part_marker, &base.part_marker),
        }
    }
}

/// Named variant that specialises another one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDefinition {
    pub name: String,
    pub extends: String,
    pub overrides: VariantOverride,
}

#[derive(Debug, Clone)]
enum RegistryEntry {
    Base(FormatVariant),
    Derived(VariantDefinition),
}

fn take_string(mapping: &mut serde_yaml::Mapping, key: &str) -> PslResult<String> {
    match mapping.remove(key) {
        Some(serde_yaml::Value::String(value)) if !value.trim().is_empty() => Ok(value),
        _ => Err(PslError::configuration(format!(
            "variant definition needs a non-empty string '{}'",
            key
        ))),
    }
}

/// Collection of known variants, resolved by name through `extends` chains
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in variants
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_base(FormatVariant::generic());

        registry.register(VariantDefinition {
            name: "drawing-register".to_string(),
            extends: "generic".to_string(),
            overrides: VariantOverride {
                meta_labels: Some(strings(&["Drawing No", "Revision", "Title"])),
                owner_ident: Some(vec![ParseSpec::new("{}r{}", &["Drawing No", "Revision"])]),
                owner_description: Some(vec![ParseSpec::new("{}", &["Title"])]),
                required_columns: Some(strings(&[
                    "Level",
                    "Parent",
                    "Drawing No",
                    "Material No",
                    "Description",
                    "Ref Des",
                    "Qty",
                    "Item Type",
                ])),
                ident_specs: Some(vec![
                    IdentSpec::new("{}", &["Drawing No"], Some(DomainTag::Drawing)),
                    IdentSpec::new(
                        "{} {}",
                        &["Material No", "Description"],
                        Some(DomainTag::Material),
                    ),
                ]),
                parent_specs: Some(vec![ParseSpec::new("{}", &["Parent"])]),
                level_field: Some("Level".to_string()),
                quantity: Some(QuantityMode::Column("Qty".to_string())),
                refdes_field: Some("Ref Des".to_string()),
                description_field: Some("Description".to_string()),
                type_field: Some("Item Type".to_string()),
                ..Default::default()
            },
        });

        registry.register(VariantDefinition {
            name: "drawing-register-single".to_string(),
            extends: "drawing-register".to_string(),
            overrides: VariantOverride {
                quantity: Some(QuantityMode::Fixed),
                ..Default::default()
            },
        });

        registry
    }

    pub fn register_base(&mut self, variant: FormatVariant) {
        self.entries
            .insert(variant.name.clone(), RegistryEntry::Base(variant));
    }

    pub fn register(&mut self, definition: VariantDefinition) {
        self.entries
            .insert(definition.name.clone(), RegistryEntry::Derived(definition));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Register a variant from YAML. Documents with an `extends` key are
    /// overrides; all others must describe a complete variant.
    pub fn load_yaml(&mut self, source: &str) -> PslResult<String> {
        let value: serde_yaml::Value = serde_yaml::from_str(source)?;

        let name = match value {
            serde_yaml::Value::Mapping(mut mapping) if mapping.contains_key("extends") => {
                let name = take_string(&mut mapping, "name")?;
                let extends = take_string(&mut mapping, "extends")?;
                let overrides: VariantOverride =
                    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?;
                self.register(VariantDefinition {
                    name: name.clone(),
                    extends,
                    overrides,
                });
                name
            }
            other => {
                let variant: FormatVariant = serde_yaml::from_value(other)?;
                let name = variant.name.clone();
                self.register_base(variant);
                name
            }
        };

        tracing::debug!(variant = %name, "Registered format variant");
        Ok(name)
    }

    /// Load every `*.yaml` / `*.yml` file in `dir`, in file name order
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> PslResult<Vec<String>> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| PslError::io(format!("{}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        let mut names = Vec::new();
        for path in paths {
            let source = std::fs::read_to_string(&path)
                .map_err(|e| PslError::io(format!("{}: {}", path.display(), e)))?;
            let name = self.load_yaml(&source).map_err(|e| match e {
                PslError::Configuration { message } => {
                    PslError::configuration(format!("{}: {}", path.display(), message))
                }
                other => other,
            })?;
            names.push(name);
        }
        Ok(names)
    }

    /// Merge the `extends` chain of `name` into a complete, validated variant
    pub fn resolve(&self, name: &str) -> PslResult<FormatVariant> {
        let mut chain: Vec<&VariantDefinition> = Vec::new();
        let mut current = name;

        let base = loop {
            match self.entries.get(current) {
                Some(RegistryEntry::Base(variant)) => break variant,
                Some(RegistryEntry::Derived(definition)) => {
                    if chain.iter().any(|d| d.name == definition.name) {
                        return Err(PslError::configuration(format!(
                            "variant '{}' has a cyclic extends chain",
                            name
                        )));
                    }
                    chain.push(definition);
                    current = &definition.extends;
                }
                None => return Err(PslError::unknown_variant(current)),
            }
        };

        let mut variant = base.clone();
        for definition in chain.iter().rev() {
            variant = definition.overrides.apply(&variant, &definition.name);
        }
        variant.name = name.to_string();

        variant.validate_config()?;
        Ok(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_variants_resolve() {
        let registry = VariantRegistry::builtin();
        for name in ["generic", "drawing-register", "drawing-register-single"] {
            let variant = registry.resolve(name).unwrap();
            assert_eq!(variant.name, name);
        }
    }

    #[test]
    fn test_override_merges_field_by_field() {
        let registry = VariantRegistry::builtin();
        let single = registry.resolve("drawing-register-single").unwrap();
        let register = registry.resolve("drawing-register").unwrap();

        assert_eq!(single.quantity, QuantityMode::Fixed);
        assert!(!single.expands_quantity());
        assert_eq!(single.required_columns, register.required_columns);
        assert_eq!(single.ident_specs, register.ident_specs);
        // inherited from generic through two levels
        assert_eq!(single.assembly_marker, "Assembly");
        assert_eq!(single.dialect, Dialect::default());
    }

    #[test]
    fn test_unknown_variant() {
        let registry = VariantRegistry::builtin();
        assert_eq!(
            registry.resolve("altium").unwrap_err(),
            PslError::unknown_variant("altium")
        );
    }

    #[test]
    fn test_unknown_base_reported() {
        let mut registry = VariantRegistry::builtin();
        registry.register(VariantDefinition {
            name: "orphan".to_string(),
            extends: "missing".to_string(),
            overrides: VariantOverride::default(),
        });
        assert_eq!(
            registry.resolve("orphan").unwrap_err(),
            PslError::unknown_variant("missing")
        );
    }

    #[test]
    fn test_cyclic_extends_rejected() {
        let mut registry = VariantRegistry::new();
        registry.register(VariantDefinition {
            name: "a".to_string(),
            extends: "b".to_string(),
            overrides: VariantOverride::default(),
        });
        registry.register(VariantDefinition {
            name: "b".to_string(),
            extends: "a".to_string(),
            overrides: VariantOverride::default(),
        });

        let err = registry.resolve("a").unwrap_err();
        assert!(matches!(err, PslError::Configuration { ref message } if message.contains("cyclic")));
    }

    #[test]
    fn test_yaml_override() {
        let mut registry = VariantRegistry::builtin();
        let name = registry
            .load_yaml(
                r#"
name: semicolon-export
extends: generic
dialect:
  delimiter: ";"
  quote: "'"
quantity: fixed
assembly_marker: ASM
"#,
            )
            .unwrap();
        assert_eq!(name, "semicolon-export");

        let variant = registry.resolve("semicolon-export").unwrap();
        assert_eq!(variant.dialect.delimiter, ';');
        assert_eq!(variant.dialect.quote, '\'');
        assert!(variant.dialect.trim);
        assert_eq!(variant.quantity, QuantityMode::Fixed);
        assert_eq!(variant.assembly_marker, "ASM");
        assert_eq!(variant.level_field, "level");
    }

    #[test]
    fn test_yaml_override_with_tagged_idents() {
        let mut registry = VariantRegistry::builtin();
        registry
            .load_yaml(
                r#"
name: catalogue
extends: generic
ident_specs:
  - template: "{}"
    fields: [drawing]
    domain: drawing
  - template: "{}-{}"
    fields: [vendor, mpn]
    domain:
      other: catalogue
quantity:
  column: count
"#,
            )
            .unwrap();

        let variant = registry.resolve("catalogue").unwrap();
        assert_eq!(variant.ident_specs[0].domain, Some(DomainTag::Drawing));
        assert_eq!(
            variant.ident_specs[1].domain,
            Some(DomainTag::Other("catalogue".to_string()))
        );
        assert_eq!(variant.quantity, QuantityMode::Column("count".to_string()));
    }

    #[test]
    fn test_yaml_unknown_override_field_rejected() {
        let mut registry = VariantRegistry::builtin();
        let err = registry
            .load_yaml("name: typo\nextends: generic\nlevel_feild: depth\n")
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_template_arity_validated() {
        let mut variant = FormatVariant::generic();
        variant.owner_ident = vec![ParseSpec::new("{}r{}", &["ident"])];

        let err = variant.validate_config().unwrap_err();
        assert!(err.to_string().contains("owner_ident"));
    }

    #[test]
    fn test_empty_required_fields_rejected() {
        let mut variant = FormatVariant::generic();
        variant.required_columns.clear();
        variant.level_field.clear();

        let message = variant.validate_config().unwrap_err().to_string();
        assert!(message.contains("required_columns"));
        assert!(message.contains("level_field"));
    }

    #[test]
    fn test_dialect_validated() {
        let mut variant = FormatVariant::generic();
        variant.dialect.delimiter = '§';
        assert!(variant.validate_config().is_err());

        variant.dialect = Dialect {
            delimiter: ';',
            quote: ';',
            trim: true,
        };
        assert!(variant.validate_config().is_err());
    }
}
