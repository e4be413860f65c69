//! Metadata block reader
//!
//! The table body is preceded by one `label,value` record per expected
//! label, in declared order.

use csv::StringRecord;
use indexmap::IndexMap;
use std::io::Read;

use crate::error::{PslError, PslResult};

/// Metadata values keyed by label, in declared order
pub type MetaMap = IndexMap<String, String>;

pub fn read_meta<R: Read>(reader: &mut csv::Reader<R>, labels: &[String]) -> PslResult<MetaMap> {
    let mut meta = MetaMap::with_capacity(labels.len());
    let mut record = StringRecord::new();

    for expected in labels {
        if !reader.read_record(&mut record)? {
            return Err(PslError::MetadataTruncated {
                expected: expected.clone(),
            });
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let found = record.get(0).unwrap_or("").trim();
        if found != expected {
            return Err(PslError::metadata(found, expected.as_str(), line));
        }

        let value = record.get(1).unwrap_or("").trim();
        meta.insert(expected.clone(), value.to_string());
    }

    tracing::debug!(labels = meta.len(), "Read metadata block");
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psl::variant::Dialect;

    fn labels() -> Vec<String> {
        vec!["ident".to_string(), "revision".to_string(), "description".to_string()]
    }

    fn reader(input: &str) -> csv::Reader<&[u8]> {
        Dialect::default().reader_builder().from_reader(input.as_bytes())
    }

    #[test]
    fn test_reads_labels_in_order() {
        let mut reader = reader("ident,R1\nrevision, A\ndescription,\"Widget, large\",,\nlevel,parent\n");
        let meta = read_meta(&mut reader, &labels()).unwrap();

        let pairs: Vec<(&str, &str)> = meta.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("ident", "R1"), ("revision", "A"), ("description", "Widget, large")]
        );

        // reader is left positioned at the column header
        let mut header = StringRecord::new();
        assert!(reader.read_record(&mut header).unwrap());
        assert_eq!(header.get(0), Some("level"));
    }

    #[test]
    fn test_label_mismatch_is_fatal() {
        let mut reader = reader("ident,R1\nrev,A\ndescription,Widget\n");
        let err = read_meta(&mut reader, &labels()).unwrap_err();
        assert_eq!(err, PslError::metadata("rev", "revision", 2));
    }

    #[test]
    fn test_missing_value_is_empty() {
        let mut reader = reader("ident,R1\nrevision\ndescription,Widget\n");
        let meta = read_meta(&mut reader, &labels()).unwrap();
        assert_eq!(meta["revision"], "");
    }

    #[test]
    fn test_truncated_block() {
        let mut reader = reader("ident,R1\n");
        let err = read_meta(&mut reader, &labels()).unwrap_err();
        assert_eq!(
            err,
            PslError::MetadataTruncated {
                expected: "revision".to_string()
            }
        );
    }
}
