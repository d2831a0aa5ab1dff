use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use daq_config::config::AppConfig;
use daq_config::diagnostics::{log_diagnostics, Diagnostics, MemoryDiagnostics, SharedDiagnostics};
use daq_config::logic::{object_labels, render_outline, to_dot, tree_to_value, OksSchemaTree};
use daq_config::model::{ConfigType, NameList};
use daq_config::store::{
    ClassObjectManager, ConfigBackend, ConffwkBackend, NamedObject, ObjectManager, OksBackend,
};
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(
    name = "daq-config",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect OKS schema and Conffwk data configurations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./daq-config.* if present)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the objects of a schema or data file
    List {
        file: String,

        /// Only objects of these classes
        #[arg(long = "class")]
        classes: Vec<String>,
    },
    /// Print the superclass tree of a schema class
    Tree {
        schema: String,
        class: String,

        #[arg(long, value_enum, default_value = "outline")]
        format: TreeFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TreeFormat {
    Outline,
    Json,
    Dot,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = AppConfig::load_from(cli.settings.as_deref())?;

    env_logger::Builder::new()
        .filter_level(settings.log_level())
        .init();

    let findings = Rc::new(MemoryDiagnostics::with_capacity(
        settings.logging.diagnostics_capacity,
    ));
    let diagnostics: SharedDiagnostics = findings.clone();

    let result = match cli.command {
        Commands::List { file, classes } => list(&settings, &file, classes, diagnostics),
        Commands::Tree {
            schema,
            class,
            format,
        } => tree(&settings, &schema, &class, format, diagnostics),
    };

    // Findings go to stderr after the listing so they do not interleave with it
    let sink = log_diagnostics();
    for entry in findings.entries() {
        sink.report(entry.finding);
    }
    result
}

fn list(
    settings: &AppConfig,
    file: &str,
    classes: Vec<String>,
    diagnostics: SharedDiagnostics,
) -> anyhow::Result<()> {
    let filter = (!classes.is_empty()).then(|| NameList::from(classes));
    let placeholder = settings.display.id_placeholder.as_str();

    if ConfigType::Schema.matches_name(file) {
        let backend = OksBackend::with_path(file, diagnostics)
            .with_context(|| format!("opening schema {}", file))?;
        print_labels(backend.handler(), filter, placeholder)
    } else {
        let backend = ConffwkBackend::with_path(file, diagnostics)
            .with_context(|| format!("opening data {}", file))?;
        print_labels(backend.handler(), filter, placeholder)
    }
}

fn print_labels<H: ObjectManager>(
    handler: &H,
    filter: Option<NameList>,
    placeholder: &str,
) -> anyhow::Result<()> {
    match filter {
        None => {
            for label in object_labels(handler, placeholder)? {
                println!("{}\t{}", label.label, label.widget_id);
            }
        }
        Some(filter) => {
            for obj in handler.get_all_obj(Some(filter))? {
                let name = obj.name()?;
                println!("{}\t{}", name, daq_config::logic::widget_id(&name, placeholder));
            }
        }
    }
    Ok(())
}

fn tree(
    settings: &AppConfig,
    schema: &str,
    class: &str,
    format: TreeFormat,
    diagnostics: SharedDiagnostics,
) -> anyhow::Result<()> {
    let backend = OksBackend::with_path(schema, diagnostics.clone())
        .with_context(|| format!("opening schema {}", schema))?;
    let leaf = backend.handler().get_obj(class)?;
    let schema_tree = OksSchemaTree::build_with_root_id(
        backend.handler(),
        &leaf,
        &settings.tree.root_id,
        diagnostics,
    )?;

    match format {
        TreeFormat::Outline => print!("{}", render_outline(schema_tree.tree(), settings.display.indent)),
        TreeFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&tree_to_value(schema_tree.tree())?)?
        ),
        TreeFormat::Dot => println!("{}", to_dot(schema_tree.tree())?),
    }
    Ok(())
}
