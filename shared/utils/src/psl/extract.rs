//! Composite value extraction
//!
//! Given a field source and ordered candidate specs, returns the first
//! candidate whose formatted, trimmed value is non-empty.

use indexmap::IndexMap;
use psl_models::DomainTag;

use super::template::format_template;
use super::variant::{IdentSpec, ParseSpec};

/// Row or metadata values addressed by field name
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<&str>;
}

impl FieldSource for IndexMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

pub trait CandidateSpec {
    fn template(&self) -> &str;
    fn fields(&self) -> &[String];
    fn domain(&self) -> Option<&DomainTag> {
        None
    }
}

impl CandidateSpec for ParseSpec {
    fn template(&self) -> &str {
        &self.template
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl CandidateSpec for IdentSpec {
    fn template(&self) -> &str {
        &self.template
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn domain(&self) -> Option<&DomainTag> {
        self.domain.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub value: String,
    pub domain: Option<DomainTag>,
}

pub fn extract<S, C>(source: &S, candidates: &[C]) -> Option<Extracted>
where
    S: FieldSource + ?Sized,
    C: CandidateSpec,
{
    candidates.iter().find_map(|candidate| {
        let values: Vec<&str> = candidate
            .fields()
            .iter()
            .map(|name| source.field(name).unwrap_or(""))
            .collect();

        let value = format_template(candidate.template(), &values).trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(Extracted {
                value,
                domain: candidate.domain().cloned(),
            })
        }
    })
}

/// Like [`extract`] but discards the domain tag
pub fn extract_value<S, C>(source: &S, candidates: &[C]) -> Option<String>
where
    S: FieldSource + ?Sized,
    C: CandidateSpec,
{
    extract(source, candidates).map(|e| e.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ident_specs() -> Vec<IdentSpec> {
        vec![
            IdentSpec::new("{}", &["Drawing No"], Some(DomainTag::Drawing)),
            IdentSpec::new("{} {}", &["Material No", "Description"], Some(DomainTag::Material)),
        ]
    }

    #[test]
    fn test_first_candidate_wins() {
        let row = row(&[
            ("Drawing No", "DWG-0042"),
            ("Material No", "M-100"),
            ("Description", "Bracket"),
        ]);
        let extracted = extract(&row, &ident_specs()).unwrap();
        assert_eq!(extracted.value, "DWG-0042");
        assert_eq!(extracted.domain, Some(DomainTag::Drawing));
    }

    #[test]
    fn test_falls_through_blank_candidates() {
        let row = row(&[
            ("Drawing No", "   "),
            ("Material No", "M-100"),
            ("Description", " Hex bolt "),
        ]);
        let extracted = extract(&row, &ident_specs()).unwrap();
        assert_eq!(extracted.value, "M-100  Hex bolt");
        assert_eq!(extracted.domain, Some(DomainTag::Material));
    }

    #[test]
    fn test_absent_fields_format_empty() {
        let row = row(&[("refdes", "R7")]);
        let specs = vec![
            IdentSpec::new("{}", &["ident"], None),
            IdentSpec::new("{}", &["refdes"], None),
        ];
        let extracted = extract(&row, &specs).unwrap();
        assert_eq!(extracted.value, "R7");
        assert_eq!(extracted.domain, None);
    }

    #[test]
    fn test_no_candidate_yields_none() {
        let row = row(&[("Drawing No", ""), ("Material No", ""), ("Description", "")]);
        assert!(extract(&row, &ident_specs()).is_none());
        assert!(extract_value(&row, &Vec::<ParseSpec>::new()).is_none());
    }

    #[test]
    fn test_parse_spec_over_metadata() {
        let meta = row(&[("ident", "MD685"), ("revision", "08")]);
        let specs = vec![ParseSpec::new("{}r{}", &["ident", "revision"])];
        assert_eq!(extract_value(&meta, &specs).as_deref(), Some("MD685r08"));
    }
}
