use crate::prelude::{println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "template")]
#[command(about = "Manage stored field templates")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List stored templates
    List,
    /// Print one template as JSON
    Show {
        /// Template id
        id: i64,
    },
    /// Delete a template
    Delete {
        /// Template id
        id: i64,
    },
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let store = crate::store::open_store(&global)?;

    match app.command {
        Commands::List => {
            let templates = store.list()?;
            if templates.is_empty() {
                println!("No templates stored yet");
                return Ok(());
            }

            let mut table = new_table();
            table.add_row(prettytable::row![
                "ID", "Nome", "Fornitore", "Categoria", "Tipo cliente", "Campi", "Creato"
            ]);
            for t in templates {
                table.add_row(prettytable::row![
                    t.id.map(|id| id.to_string()).unwrap_or_default(),
                    t.nome,
                    t.fornitore.unwrap_or_default(),
                    t.categoria.unwrap_or_default(),
                    t.tipo_cliente.unwrap_or_default(),
                    t.campi.len(),
                    t.created_at.format("%Y-%m-%d %H:%M")
                ]);
            }
            println!("{}", table);
            Ok(())
        }
        Commands::Show { id } => {
            let template = store.get(id)?;
            println!("{}", serde_json::to_string_pretty(&template)?);
            Ok(())
        }
        Commands::Delete { id } => {
            if store.delete(id)? {
                println!("Deleted template {}", id);
                Ok(())
            } else {
                Err(eyre!("Template {} not found", id))
            }
        }
    }
}
