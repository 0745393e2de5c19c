use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use qrstamp::config::StyleConfig;
use qrstamp::helper::{artifact_id, save_png, to_ascii_string, to_svg_string};
use qrstamp::QrCodeEcc;

/// Generate a styled QR code PNG for a URL or any text.
#[derive(Parser, Debug)]
#[command(name = "qrstamp", version, about)]
struct Args {
    /// Text or URL to encode
    text: String,

    /// JSON style file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Error correction level: L, M, Q or H
    #[arg(long)]
    ecc: Option<QrCodeEcc>,

    /// Pixels per module
    #[arg(long)]
    scale: Option<i64>,

    /// Background color (name or #rrggbb)
    #[arg(long)]
    bg_color: Option<String>,

    /// Transparent background
    #[arg(long)]
    transparent: bool,

    /// Color of the dark modules
    #[arg(long)]
    fill_color: Option<String>,

    /// Border width in pixels, 0 for none
    #[arg(long, allow_hyphen_values = true)]
    border_width: Option<i64>,

    /// Corner radius of the border in pixels
    #[arg(long, allow_hyphen_values = true)]
    border_radius: Option<i64>,

    #[arg(long)]
    border_color: Option<String>,

    /// Quiet zone in pixels
    #[arg(long, allow_hyphen_values = true)]
    padding: Option<i64>,

    /// Logo image placed at the center
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "static/qrcodes")]
    out_dir: PathBuf,

    /// File name without extension; derived from the URL when omitted
    #[arg(long)]
    name: Option<String>,

    /// Also print the SVG markup, with the background and fill colors but no logo or border
    #[arg(long)]
    svg: bool,

    /// Also print the symbol as text
    #[arg(long)]
    ascii: bool,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn style_config(&self) -> qrstamp::Result<StyleConfig> {
        let mut config = match &self.config {
            Some(path) => StyleConfig::load(path)?,
            None => StyleConfig::default(),
        };
        if let Some(ecc) = self.ecc {
            config.ecc = ecc;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(color) = &self.bg_color {
            config.bg_color = color.clone();
        }
        if self.transparent {
            config.transparent_bg = true;
        }
        if let Some(color) = &self.fill_color {
            config.fill_color = color.clone();
        }
        if let Some(width) = self.border_width {
            config.border_width = width;
        }
        if let Some(radius) = self.border_radius {
            config.border_radius = radius;
        }
        if let Some(color) = &self.border_color {
            config.border_color = color.clone();
        }
        if self.padding.is_some() {
            config.padding = self.padding;
        }
        if self.logo.is_some() {
            config.logo = self.logo.clone();
        }
        Ok(config)
    }
}

fn run(args: &Args) -> qrstamp::Result<()> {
    let config = args.style_config()?;
    let style = config.to_style()?;
    let scale = config.scale()?;

    let qr = qrstamp::encode(args.text.as_bytes(), config.ecc)?;
    info!(
        "encoded {} bytes as version {} with {:?} error correction",
        args.text.len(),
        qr.version(),
        qr.error_correction_level()
    );

    if args.ascii {
        print!("{}", to_ascii_string(&qr, style.quiet_zone));
    }
    if args.svg {
        print!("{}", to_svg_string(&qr, &style));
    }

    let img = qrstamp::render(&qr, &style, scale)?;
    let name = args.name.clone().or_else(|| artifact_id(&args.text));
    let path = save_png(&img, Some(args.out_dir.as_path()), name.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qrstamp: {e}");
            ExitCode::FAILURE
        }
    }
}
