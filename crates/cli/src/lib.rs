use annotator_core::config::AnnotatorConfig;
use annotator_core::events::EventBus;
use annotator_core::store::AnnotationStore;
use annotator_core::view_settings::ViewSettings;
use annotator_model::{AnnotationDraft, RecordId, Rotation, Viewport};
use annotator_storage::FileStore;
use annotator_ui::page::{render_page, StaticHost};
use annotator_ui::renderer::AnnotationRenderer;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ANNOTATOR_LOG";

#[derive(Debug, Parser)]
#[command(name = "annotator")]
#[command(about = "Annotation store and overlay renderer for document pages")]
pub struct Cli {
    /// Directory holding annotation data. Overrides the config file and ANNOTATOR_DATA_DIR.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List annotations, grouped by page unless --page is given.
    List {
        document: String,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Print one annotation or comment.
    Show { document: String, id: String },
    /// Add an annotation from a JSON draft.
    Add {
        document: String,
        #[arg(long)]
        page: u32,
        #[arg(long, value_name = "JSON")]
        json: String,
    },
    /// Replace an annotation with a JSON draft. Id and page are kept.
    Edit {
        document: String,
        id: String,
        #[arg(long, value_name = "JSON")]
        json: String,
    },
    /// Move an annotation to another page.
    Move {
        document: String,
        id: String,
        #[arg(long)]
        page: u32,
    },
    /// Delete an annotation.
    Delete { document: String, id: String },
    /// Append a note to an annotation.
    Note { document: String, id: String, text: String },
    /// Manage comments.
    #[command(subcommand)]
    Comment(CommentCommands),
    /// Delete every annotation and comment of a document.
    Clear { document: String },
    /// Show or change per-document view settings.
    Settings(SettingsArgs),
    /// Render the annotation overlay of one page as SVG.
    Render(RenderArgs),
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum CommentCommands {
    /// Attach a comment to an annotation.
    Add { document: String, annotation: String, content: String },
    /// List comments, optionally for one annotation.
    List {
        document: String,
        #[arg(long)]
        annotation: Option<String>,
    },
    /// Delete a comment.
    Delete { document: String, id: String },
}

#[derive(Debug, Args)]
struct SettingsArgs {
    document: String,
    #[arg(long)]
    scale: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<i32>,
    #[arg(long)]
    text_size: Option<f64>,
    #[arg(long)]
    text_color: Option<String>,
}

#[derive(Debug, Args)]
struct RenderArgs {
    document: String,
    #[arg(long)]
    page: u32,
    /// Page width at scale 1.
    #[arg(long)]
    width: f64,
    /// Page height at scale 1.
    #[arg(long)]
    height: f64,
    /// Overrides the stored scale.
    #[arg(long)]
    scale: Option<f64>,
    /// Overrides the stored rotation.
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<i32>,
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,
}

#[derive(Debug, Serialize)]
struct SettingsOutput {
    scale: f64,
    rotation: i32,
    text_size: f64,
    text_color: String,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    deleted: bool,
}

/// Installs the stderr log subscriber, filtered by `ANNOTATOR_LOG` (default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = AnnotatorConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let backend = FileStore::from_config(&config).context("failed to open annotation storage")?;
    tracing::debug!(root = %backend.root().display(), "using file store");

    let store = AnnotationStore::new(backend.clone(), EventBus::new());
    let settings = ViewSettings::new(backend, config.view.clone());

    match cli.command {
        Commands::List { document, page } => match page {
            Some(page) => print_json(&store.get_by_page(&document, page)?),
            None => print_json(&store.get_all(&document)?),
        },
        Commands::Show { document, id } => print_json(&store.get_one(&document, &RecordId::new(id))?),
        Commands::Add { document, page, json } => {
            let draft = parse_draft(&json)?;
            print_json(&store.add(&document, page, draft)?)
        }
        Commands::Edit { document, id, json } => {
            let draft = parse_draft(&json)?;
            print_json(&store.edit(&document, &RecordId::new(id), draft)?)
        }
        Commands::Move { document, id, page } => {
            print_json(&store.move_to_page(&document, &RecordId::new(id), page)?)
        }
        Commands::Delete { document, id } => {
            if !store.delete(&document, &RecordId::new(id.as_str()))? {
                anyhow::bail!("no annotation `{id}` in document `{document}`");
            }
            print_json(&DeleteOutput { deleted: true })
        }
        Commands::Note { document, id, text } => {
            print_json(&store.add_note(&document, &RecordId::new(id), text)?)
        }
        Commands::Comment(command) => run_comment(&store, command),
        Commands::Clear { document } => {
            store.clear(&document)?;
            Ok(())
        }
        Commands::Settings(args) => run_settings(&settings, args),
        Commands::Render(args) => run_render(&store, &settings, args),
        Commands::Version => Ok(()),
    }
}

fn run_comment(store: &AnnotationStore<FileStore>, command: CommentCommands) -> Result<()> {
    match command {
        CommentCommands::Add { document, annotation, content } => {
            print_json(&store.add_comment(&document, &RecordId::new(annotation), content)?)
        }
        CommentCommands::List { document, annotation: Some(annotation) } => {
            print_json(&store.get_comments(&document, &RecordId::new(annotation))?)
        }
        CommentCommands::List { document, annotation: None } => print_json(&store.get_all_comments(&document)?),
        CommentCommands::Delete { document, id } => {
            if !store.delete_comment(&document, &RecordId::new(id.as_str()))? {
                anyhow::bail!("no comment `{id}` in document `{document}`");
            }
            print_json(&DeleteOutput { deleted: true })
        }
    }
}

fn run_settings(settings: &ViewSettings<FileStore>, args: SettingsArgs) -> Result<()> {
    let document = args.document.as_str();

    if let Some(scale) = args.scale {
        settings.set_scale(document, scale)?;
    }
    if let Some(degrees) = args.rotation {
        settings.set_rotation(document, Rotation::from_degrees(degrees)?)?;
    }
    if let Some(size) = args.text_size {
        settings.set_text_size(document, size)?;
    }
    if let Some(color) = &args.text_color {
        settings.set_text_color(document, color)?;
    }

    print_json(&SettingsOutput {
        scale: settings.scale(document)?,
        rotation: settings.rotation(document)?.degrees(),
        text_size: settings.text_size(document)?,
        text_color: settings.text_color(document)?,
    })
}

fn run_render(store: &AnnotationStore<FileStore>, settings: &ViewSettings<FileStore>, args: RenderArgs) -> Result<()> {
    let document = args.document.as_str();

    let scale = match args.scale {
        Some(scale) => scale,
        None => settings.scale(document)?,
    };
    let rotation = match args.rotation {
        Some(degrees) => Rotation::from_degrees(degrees)?,
        None => settings.rotation(document)?,
    };
    let viewport = Viewport::for_page(args.width, args.height, scale, rotation)?;

    let annotations = store.get_by_page(document, args.page)?;
    let host = StaticHost { device_pixel_ratio: args.dpr };
    let mut renderer = AnnotationRenderer::new();
    let page = render_page(document, args.page, &annotations, &viewport, &host, &mut renderer)?;

    tracing::info!(
        document,
        page = args.page,
        annotations = renderer.stats().annotation_count,
        nodes = renderer.stats().node_count,
        "page rendered"
    );
    println!("{}", page.to_svg()?);
    Ok(())
}

fn parse_draft(json: &str) -> Result<AnnotationDraft> {
    serde_json::from_str(json).context("invalid annotation JSON")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
