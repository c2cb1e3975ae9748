use fieldmap_core::classify::FieldInfo;
use fieldmap_core::template::Template;
use pdfform::{FieldContext, ParsedForm, SearchConfig};

use crate::classify::{classify_fields, classify_fields_heuristic};
use crate::config::AiConfig;
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "extract")]
#[command(about = "Extract and classify the form fields of a contract PDF")]
pub struct App {
    /// Path to the PDF file
    pub path: std::path::PathBuf,

    /// Template name (defaults to the file stem)
    #[clap(long)]
    pub nome: Option<String>,

    /// Provider the form belongs to
    #[clap(long)]
    pub fornitore: Option<String>,

    /// Template category (luce, gas, dual, ...)
    #[clap(long)]
    pub categoria: Option<String>,

    /// Target client type (domestico, business, ...)
    #[clap(long = "tipo-cliente")]
    pub tipo_cliente: Option<String>,

    /// Skip the AI tier and classify heuristically
    #[clap(long)]
    pub no_ai: bool,

    /// Persist the resulting template
    #[clap(long)]
    pub save: bool,

    /// Output the template as JSON
    #[clap(long)]
    pub json: bool,

    /// AI provider override (openai, anthropic)
    #[clap(long)]
    pub ai_provider: Option<String>,

    /// AI base URL override
    #[clap(long)]
    pub ai_base_url: Option<String>,

    /// AI model override
    #[clap(long)]
    pub ai_model: Option<String>,

    /// AI API key override
    #[clap(long)]
    pub ai_key: Option<String>,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let bytes = std::fs::read(&app.path)
        .map_err(|e| eyre!("Failed to read '{}': {}", app.path.display(), e))?;

    let nome = app.nome.clone().unwrap_or_else(|| {
        app.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string())
    });

    let template = extract_template_data(&bytes, &app, nome, global.verbose).await?;

    if app.save {
        let store = crate::store::open_store(&global)?;
        let id = store.insert(&template)?;
        println!(
            "Saved template {} \"{}\" ({} fields)",
            id,
            template.nome,
            template.campi.len()
        );
    }

    if app.json {
        println!("{}", serde_json::to_string_pretty(&template)?);
    } else {
        print_field_table(&template);
    }

    Ok(())
}

/// Run the full pipeline on in-memory PDF bytes and return the template.
///
/// Every interactive field of the document appears exactly once in the
/// result's `campi`, regardless of AI availability.
pub async fn extract_template_data(
    bytes: &[u8],
    app: &App,
    nome: String,
    verbose: bool,
) -> Result<Template> {
    let parsed = ParsedForm::from_bytes(bytes).map_err(|e| eyre!(e))?;

    if parsed.fields.is_empty() {
        return Err(eyre!(
            "No interactive form fields found: the document has no AcroForm \
             (flat layouts are not supported by this pipeline)"
        ));
    }

    if verbose {
        eprintln!(
            "Found {} fields and {} text runs",
            parsed.fields.len(),
            parsed.runs.len()
        );
    }
    if parsed.runs.is_empty() {
        // Fully rasterized pages parse fine but carry no context; the
        // classification degrades in quality only.
        log::debug!("no extractable text; classifying without page context");
    }

    let contexts = parsed.resolve_contexts(&SearchConfig::default());
    let infos: Vec<FieldInfo> = contexts.iter().map(field_info).collect();

    let campi = if app.no_ai {
        classify_fields_heuristic(&infos)
    } else {
        let config = AiConfig::from_env()?.with_overrides(
            app.ai_provider.clone(),
            app.ai_base_url.clone(),
            app.ai_model.clone(),
            app.ai_key.clone(),
        )?;
        if config.is_configured() {
            classify_fields(&config, &infos).await?
        } else {
            log::warn!("no AI API key configured; using heuristic classification only");
            classify_fields_heuristic(&infos)
        }
    };

    Ok(Template::new(
        nome,
        app.fornitore.clone(),
        app.categoria.clone(),
        app.tipo_cliente.clone(),
        campi,
    ))
}

fn field_info(ctx: &FieldContext) -> FieldInfo {
    FieldInfo {
        name: ctx.field.name.clone(),
        field_type: ctx.field.kind.as_str().to_string(),
        width: ctx.field.rect.width,
        max_length: ctx.field.max_length,
        context: ctx.summary(),
    }
}

fn print_field_table(template: &Template) {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Field", "Type", "Label", "Category", "Data type", "Required", "Mapping"
    ]);
    for (name, af) in &template.campi {
        table.add_row(prettytable::row![
            name,
            af.field_type,
            af.label,
            af.category.as_str(),
            af.data_type.as_str(),
            if af.required { "yes" } else { "no" },
            af.mapping_suggestion
        ]);
    }
    println!("{}", table);
}
