use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "badgekit", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a card as PNG or PDF (chosen by the output extension).
    Render(RenderArgs),
    /// Check a template document and report the first problem.
    Validate(ValidateArgs),
    /// Encode or decode shared links.
    #[command(subcommand)]
    Link(LinkCommand),
    /// Publish a template into a directory-backed object store.
    Publish(PublishArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Data record JSON (field key to value).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Output path; `.pdf` writes a PDF, anything else a PNG.
    #[arg(long, default_value = "card.png")]
    out: PathBuf,

    /// Device pixels per logical pixel (overrides `BADGEKIT_RENDER_SCALE`).
    #[arg(long)]
    scale: Option<f64>,

    /// Fill fields with `[Label]` placeholders, as the editor preview does.
    #[arg(long)]
    preview: bool,

    /// Directory of `.ttf`/`.otf` fonts (overrides `BADGEKIT_FONTS_DIR`).
    #[arg(long)]
    fonts_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,
}

#[derive(Subcommand, Debug)]
enum LinkCommand {
    /// Print the shared-link payload of a template.
    Encode {
        /// Template JSON.
        #[arg(long)]
        template: PathBuf,
    },
    /// Decode a shared-link payload into template JSON.
    Decode {
        /// Link payload.
        #[arg(long)]
        link: String,
        /// Output path; prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
struct PublishArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Human-readable name, turned into the slug.
    #[arg(long)]
    name: String,

    /// Object store root directory.
    #[arg(long)]
    store: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "badgekit=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Link(cmd) => cmd_link(cmd),
        Command::Publish(args) => cmd_publish(args),
    }
}

fn read_template(path: &Path) -> anyhow::Result<badgekit::Template> {
    badgekit::Template::from_path(path)
        .with_context(|| format!("load template '{}'", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;

    let data = if args.preview {
        badgekit::DataRecord::placeholder(&template)
    } else if let Some(path) = &args.data {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read data '{}'", path.display()))?;
        badgekit::DataRecord::from_json(&s)?
    } else {
        badgekit::DataRecord::for_template(&template)
    };

    let mut settings = badgekit::RenderSettings::from_env();
    if std::env::var_os("BADGEKIT_ASSETS_ROOT").is_none() {
        settings.assets_root = args
            .template
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
    }
    if let Some(scale) = args.scale {
        anyhow::ensure!(
            scale.is_finite() && scale > 0.0,
            "--scale must be finite and > 0"
        );
        settings.render_scale = scale;
    }
    if let Some(dir) = args.fonts_dir {
        settings.fonts_dir = Some(dir);
    }

    let mut renderer = badgekit::CardRenderer::new(settings);
    let frame = renderer.render(&template, &data)?;

    let is_pdf = args
        .out
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    let bytes = if is_pdf {
        badgekit::encode_pdf(&frame, template.meta.width_mm, template.meta.height_mm)?
    } else {
        badgekit::encode_png(&frame)?
    };
    write_output(&args.out, &bytes)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    println!(
        "ok: {}x{} mm, {} fields, {} layers",
        template.meta.width_mm,
        template.meta.height_mm,
        template.fields.len(),
        template.layers.len()
    );
    Ok(())
}

fn cmd_link(cmd: LinkCommand) -> anyhow::Result<()> {
    match cmd {
        LinkCommand::Encode { template } => {
            let template = read_template(&template)?;
            println!("{}", badgekit::encode_link(&template)?);
            Ok(())
        }
        LinkCommand::Decode { link, out } => {
            let template = badgekit::decode_link(&link)?;
            let json = template.to_json_pretty()?;
            match out {
                Some(path) => write_output(&path, json.as_bytes()),
                None => {
                    println!("{json}");
                    Ok(())
                }
            }
        }
    }
}

fn cmd_publish(args: PublishArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    let mut store = badgekit::FsObjectStore::new(args.store);
    let url = badgekit::publish_template(&mut store, &args.name, &template)?;
    eprintln!("wrote {url}");
    Ok(())
}
