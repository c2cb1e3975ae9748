use fieldmap_core::template::resolve_assignments;
use pdfform::FieldAssignment;

use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "compile")]
#[command(about = "Fill a contract PDF from a stored template and a value map")]
pub struct App {
    /// Path to the PDF file
    pub path: std::path::PathBuf,

    /// Template id to compile against
    #[clap(short, long)]
    pub template: i64,

    /// JSON file holding the semantic value map
    #[clap(short, long)]
    pub data: std::path::PathBuf,

    /// Output path for the filled PDF
    #[clap(short, long)]
    pub output: std::path::PathBuf,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let bytes = std::fs::read(&app.path)
        .map_err(|e| eyre!("Failed to read '{}': {}", app.path.display(), e))?;

    let store = crate::store::open_store(&global)?;
    let template = store.get(app.template)?;

    if global.verbose {
        eprintln!(
            "Compiling against template {} \"{}\" ({} fields)",
            app.template,
            template.nome,
            template.campi.len()
        );
    }

    let raw = std::fs::read_to_string(&app.data)
        .map_err(|e| eyre!("Failed to read '{}': {}", app.data.display(), e))?;
    let values: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| eyre!("Invalid value map JSON: {}", e))?;
    let values = values
        .as_object()
        .ok_or_else(|| eyre!("The value map must be a JSON object"))?;

    // Unresolved fields stay blank: partial fill is the accepted contract.
    let (resolved, unresolved) = resolve_assignments(&template, values);
    for name in &unresolved {
        log::warn!("no value for field '{}', leaving it blank", name);
    }

    let assignments: Vec<FieldAssignment> = resolved
        .into_iter()
        .map(|r| FieldAssignment {
            field_name: r.field_name,
            value: r.value,
        })
        .collect();

    let (filled, report) = pdfform::fill(&bytes, &assignments).map_err(|e| eyre!(e))?;
    for name in &report.unmatched {
        log::warn!("template field '{}' does not exist in the document", name);
    }

    std::fs::write(&app.output, &filled)
        .map_err(|e| eyre!("Failed to write '{}': {}", app.output.display(), e))?;

    println!(
        "Compiled {} ({} fields filled, {} left blank)",
        app.output.display(),
        report.filled.len(),
        unresolved.len() + report.unmatched.len()
    );

    Ok(())
}
