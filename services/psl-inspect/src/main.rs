//! PSL Inspect
//!
//! Parses one Parts Structure List export and prints the reconstructed
//! hierarchy as an indented tree, a JSON snapshot, or a summary.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use psl_utils::{init_logging, AppConfig, ParsedPsl, PslParser, ValidationContext, VariantRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "psl-inspect",
    version,
    about = "Reconstruct and display the hierarchy of a Parts Structure List export"
)]
struct Cli {
    /// PSL file to parse
    #[arg(required_unless_present = "list_variants")]
    file: Option<PathBuf>,

    /// Format variant name (defaults to the configured variant)
    #[arg(short, long, env = "PSL_VARIANT")]
    variant: Option<String>,

    /// Directory with additional YAML variant definitions
    #[arg(long)]
    variants_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,

    /// List the known variants and exit
    #[arg(long)]
    list_variants: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Tree,
    Json,
    Summary,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    let mut registry = VariantRegistry::builtin();
    let variants_dir = cli
        .variants_dir
        .clone()
        .or_else(|| config.parser.variants_dir.as_ref().map(PathBuf::from));
    if let Some(dir) = &variants_dir {
        let loaded = registry.load_dir(dir)?;
        info!(dir = %dir.display(), count = loaded.len(), "Loaded variant definitions");
    }

    if cli.list_variants {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let file = cli.file.clone().context("No PSL file given")?;
    let variant_name = cli.variant.as_deref().unwrap_or(&config.parser.variant);
    let variant = registry.resolve(variant_name)?;

    let mut vctx = ValidationContext::for_source(file.display().to_string());
    let parsed = PslParser::new(&file, &variant)
        .with_skip_blank_rows(config.parser.skip_blank_rows)
        .with_max_quantity(config.parser.max_quantity)
        .parse(&mut vctx)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let Some(parsed) = parsed else {
        for issue in vctx.issues() {
            eprintln!("{:?}: {}", issue.code, issue.message);
        }
        return Ok(ExitCode::from(2));
    };

    match cli.format {
        OutputFormat::Tree => print!("{}", render_tree(&parsed)),
        OutputFormat::Json => {
            let snapshot = parsed
                .tree
                .snapshot(parsed.owner)
                .context("Failed to snapshot the parsed tree")?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        OutputFormat::Summary => {
            let summary = serde_json::json!({
                "owner": parsed.owner_ident(),
                "meta": parsed.meta,
                "rows": parsed.rows_processed,
                "summary": parsed.summary(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn render_tree(parsed: &ParsedPsl) -> String {
    let mut out = String::new();
    for (_, depth, entity) in parsed.tree.walk(parsed.owner) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&entity.ident);
        if let Some(refdes) = &entity.refdes {
            out.push_str(&format!(" [{}]", refdes));
        }
        if !entity.description.is_empty() {
            out.push_str(&format!(" {}", entity.description));
        }
        if let Some(domain) = &entity.domain {
            out.push_str(&format!(" ({})", domain));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use psl_utils::{parse_str, FormatVariant, RecordingObserver};

    #[test]
    fn test_render_tree_indents_by_depth() {
        let input = "ident,R1\nrevision,A\ndescription,Widget\n\
                     level,parent,refdes,description,type,qty\n\
                     0,,ROOT,Widget,Assembly,1\n1,ROOT,R1,Bolt,Part,2\n";
        let mut vctx = ValidationContext::new();
        let mut observer = RecordingObserver::new();
        let parsed = parse_str(&FormatVariant::generic(), input, &mut vctx, &mut observer)
            .unwrap()
            .unwrap();

        assert_eq!(
            render_tree(&parsed),
            "R1rA Widget\n  ROOT [ROOT] Widget\n    R1 [R1a] Bolt\n    R1 [R1b] Bolt\n"
        );
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from(["psl-inspect", "shell.csv", "-v", "drawing-register", "-f", "json"])
            .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("shell.csv")));
        assert_eq!(cli.variant.as_deref(), Some("drawing-register"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(!cli.list_variants);

        let cli = Cli::try_parse_from(["psl-inspect", "--list-variants"]).unwrap();
        assert!(cli.list_variants);
        assert!(Cli::try_parse_from(["psl-inspect"]).is_err());
    }
}
