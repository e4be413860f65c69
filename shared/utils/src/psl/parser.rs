//! PSL file parser
//!
//! Opens a PSL export with the variant's CSV dialect and runs the hierarchy
//! builder over it. The file handle lives only for the duration of `parse`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::builder::{HierarchyBuilder, ParsedPsl, DEFAULT_MAX_QUANTITY};
use super::observer::{ParseObserver, TracingObserver};
use super::variant::FormatVariant;
use crate::error::{PslError, PslResult};
use crate::validation::ValidationContext;

pub struct PslParser<'a> {
    path: PathBuf,
    variant: &'a FormatVariant,
    skip_blank_rows: bool,
    max_quantity: usize,
}

impl<'a> PslParser<'a> {
    pub fn new(path: impl Into<PathBuf>, variant: &'a FormatVariant) -> Self {
        Self {
            path: path.into(),
            variant,
            skip_blank_rows: true,
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }

    pub fn with_skip_blank_rows(mut self, skip: bool) -> Self {
        self.skip_blank_rows = skip;
        self
    }

    /// Largest quantity a single row may expand into
    pub fn with_max_quantity(mut self, max_quantity: usize) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse with events logged through `tracing`
    pub fn parse(&self, vctx: &mut ValidationContext) -> PslResult<Option<ParsedPsl>> {
        self.parse_with(vctx, &mut TracingObserver)
    }

    pub fn parse_with(
        &self,
        vctx: &mut ValidationContext,
        observer: &mut dyn ParseObserver,
    ) -> PslResult<Option<ParsedPsl>> {
        let _span = tracing::info_span!(
            "psl_parse",
            path = %self.path.display(),
            variant = %self.variant.name
        )
        .entered();

        let file = File::open(&self.path)
            .map_err(|e| PslError::io(format!("{}: {}", self.path.display(), e)))?;

        let result = parse_reader_with(
            self.variant,
            BufReader::new(file),
            vctx,
            observer,
            self.skip_blank_rows,
            self.max_quantity,
        );

        if let Err(error) = &result {
            tracing::error!(error = %error, code = error.error_code(), "PSL parse failed");
        }
        result
    }
}

/// Parse PSL content from any reader
pub fn parse_reader<R: Read>(
    variant: &FormatVariant,
    input: R,
    vctx: &mut ValidationContext,
    observer: &mut dyn ParseObserver,
) -> PslResult<Option<ParsedPsl>> {
    parse_reader_with(variant, input, vctx, observer, true, DEFAULT_MAX_QUANTITY)
}

pub fn parse_str(
    variant: &FormatVariant,
    input: &str,
    vctx: &mut ValidationContext,
    observer: &mut dyn ParseObserver,
) -> PslResult<Option<ParsedPsl>> {
    parse_reader(variant, input.as_bytes(), vctx, observer)
}

fn parse_reader_with<R: Read>(
    variant: &FormatVariant,
    input: R,
    vctx: &mut ValidationContext,
    observer: &mut dyn ParseObserver,
    skip_blank_rows: bool,
    max_quantity: usize,
) -> PslResult<Option<ParsedPsl>> {
    let mut reader = variant.dialect.reader_builder().from_reader(input);
    HierarchyBuilder::new(variant, observer)
        .with_skip_blank_rows(skip_blank_rows)
        .with_max_quantity(max_quantity)
        .build(&mut reader, vctx)
}
