//! Output formatting for composed pages, classifications and the registry.

use page_schema_core::{Classification, CompositionError, FieldContract, Generation, SchemaRegistry};
use serde::Serialize;

/// Serialization formats for pages and content records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    /// File extension for output files in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

/// Formats for the registry listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListingFormat {
    Json,
    Markdown,
    Table,
}

/// Serializes any value in the requested data format.
pub fn format_data<T: Serialize + ?Sized>(value: &T, format: DataFormat) -> Result<String, String> {
    match format {
        DataFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        DataFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}

/// One-line human summary of a classification.
pub fn describe_classification(classification: &Classification) -> String {
    match classification {
        Classification::Matched { variant, generation } => format!("{variant} {generation}"),
        Classification::Ambiguous { variant, candidates } => {
            format!("{variant} ambiguous between {}", join_generations(candidates))
        }
        Classification::Unknown {
            input_template: Some(template),
        } => format!("unknown template `{template}`"),
        Classification::Unknown { input_template: None } => "no inputTemplate".to_string(),
    }
}

/// Renders a composition error for terminal output, path first.
pub fn describe_error(error: &CompositionError) -> String {
    format!("[{}] {error}", error.kind())
}

#[derive(Debug, Serialize)]
struct FieldView {
    name: &'static str,
    required: bool,
    kind: String,
}

#[derive(Debug, Serialize)]
struct ContractView {
    variant: &'static str,
    generation: Generation,
    fields: Vec<FieldView>,
}

impl From<&FieldContract> for ContractView {
    fn from(contract: &FieldContract) -> Self {
        Self {
            variant: contract.variant,
            generation: contract.generation,
            fields: contract
                .fields()
                .map(|spec| FieldView {
                    name: spec.name,
                    required: spec.required,
                    kind: spec.kind.describe(),
                })
                .collect(),
        }
    }
}

/// Formats the registered contracts in the requested listing format.
pub fn format_registry(registry: &SchemaRegistry, format: ListingFormat) -> Result<String, String> {
    match format {
        ListingFormat::Json => {
            let contracts: Vec<ContractView> = registry.contracts().map(ContractView::from).collect();
            serde_json::to_string_pretty(&contracts).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        ListingFormat::Markdown => Ok(registry_to_markdown(registry)),
        ListingFormat::Table => Ok(registry_to_table(registry)),
    }
}

fn registry_to_markdown(registry: &SchemaRegistry) -> String {
    let mut out = String::new();
    out.push_str("# Content registry\n\n");

    for contract in registry.contracts() {
        out.push_str(&format!("## {} {}\n\n", contract.variant, contract.generation));
        out.push_str("| Field | Required | Kind |\n");
        out.push_str("|-------|----------|------|\n");
        for spec in contract.fields() {
            let required = if spec.required { "yes" } else { "no" };
            out.push_str(&format!("| `{}` | {required} | {} |\n", spec.name, spec.kind.describe()));
        }
        out.push('\n');
    }

    out
}

fn registry_to_table(registry: &SchemaRegistry) -> String {
    let mut out = String::new();
    let width = registry.variants().map(str::len).max().unwrap_or(7).max(7);

    out.push_str(&format!("{:<width$}  GENERATIONS  LATEST FIELDS\n", "VARIANT"));
    for variant in registry.variants() {
        let generations: Vec<Generation> = registry
            .generations(variant)
            .iter()
            .map(|contract| contract.generation)
            .collect();
        let (fields, required) = registry
            .latest(variant)
            .map(|latest| (latest.fields().count(), latest.required_fields().count()))
            .unwrap_or_default();
        out.push_str(&format!(
            "{variant:<width$}  {:<11}  {fields} ({required} required)\n",
            join_generations(&generations)
        ));
    }

    out
}

fn join_generations(generations: &[Generation]) -> String {
    generations
        .iter()
        .map(Generation::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_classification() {
        let matched = Classification::Matched {
            variant: "image",
            generation: Generation::new(2),
        };
        assert_eq!(describe_classification(&matched), "image v2");

        let ambiguous = Classification::Ambiguous {
            variant: "author",
            candidates: vec![Generation::new(2), Generation::new(3)],
        };
        assert_eq!(describe_classification(&ambiguous), "author ambiguous between v2, v3");
        assert_eq!(
            describe_classification(&Classification::Unknown { input_template: None }),
            "no inputTemplate"
        );
    }

    #[test]
    fn test_registry_table_lists_every_variant() {
        let registry = SchemaRegistry::builtin();
        let table = format_registry(registry, ListingFormat::Table).unwrap();
        for variant in registry.variants() {
            assert!(table.contains(variant), "missing {variant}");
        }
        assert!(table.contains("v1, v2, v3"));
    }

    #[test]
    fn test_registry_json_has_field_kinds() {
        let json = format_registry(SchemaRegistry::builtin(), ListingFormat::Json).unwrap();
        let contracts: serde_json::Value = serde_json::from_str(&json).unwrap();
        let embed = contracts
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["variant"] == "embed")
            .unwrap();
        assert_eq!(embed["generation"], 1);
        assert_eq!(embed["fields"][0]["name"], "identifier");
        assert_eq!(embed["fields"][0]["required"], true);
    }

    #[test]
    fn test_registry_markdown_has_sections() {
        let markdown = format_registry(SchemaRegistry::builtin(), ListingFormat::Markdown).unwrap();
        assert!(markdown.starts_with("# Content registry"));
        assert!(markdown.contains("## author v3"));
        assert!(markdown.contains("| `authorType` | yes |"));
    }

    #[test]
    fn test_data_format_extension() {
        assert_eq!(DataFormat::Json.extension(), "json");
        assert_eq!(DataFormat::Yaml.extension(), "yaml");
    }
}
