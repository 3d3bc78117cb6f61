use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use wmark::{config, font, output, process};

#[derive(Parser)]
#[command(name = "wmark")]
#[command(about = "Batch text watermarking for photo folders")]
#[command(long_about = "\
Batch text watermarking for photo folders

Every png, jpg, jpeg, webp, bmp, tif and tiff file directly inside the input
directory is copied to the output directory with a text watermark drawn on
it. Outputs keep the original format and name, with _wm added to the stem:

  pics/beach.jpg  →  output/beach_wm.jpg

Settings are layered: stock defaults, then <dir>/watermark.toml (or the file
given with --config), then the flags on this command line.

Placement modes:
  bottom-right    one copy inset from the bottom-right corner
  center          one copy in the middle
  tile            a grid covering the whole image
  diagonal-tile   a wider, brick-staggered grid

Run 'wmark --print-config' for a documented watermark.toml.")]
#[command(version)]
struct Cli {
    /// Input directory
    #[arg(short, long, default_value = "pics")]
    dir: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Config file [default: <dir>/watermark.toml when present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Placement: bottom-right, center, tile, diagonal-tile [default: bottom-right]
    #[arg(short, long)]
    mode: Option<String>,

    /// Watermark text [default: sample]
    #[arg(long)]
    text: Option<String>,

    /// Fixed font size in pixels; overrides --font-ratio
    #[arg(long)]
    font_size: Option<u32>,

    /// Font size as a fraction of the --fit metric [default: 0.05]
    #[arg(long)]
    font_ratio: Option<f64>,

    /// Image metric for --font-ratio: long, short, width, height, diag [default: diag]
    #[arg(long)]
    fit: Option<String>,

    /// TTF/OTF/TTC font file [default: fonts/NotoSansJP-Regular.ttf]
    #[arg(long)]
    font: Option<PathBuf>,

    /// Face index inside a .ttc collection [default: 0]
    #[arg(long)]
    font_index: Option<u32>,

    /// Text alpha, 0-255 [default: 128]
    #[arg(long)]
    opacity: Option<u32>,

    /// Bottom-right inset as a fraction of the longer edge [default: 0.02]
    #[arg(long)]
    margin_ratio: Option<f64>,

    /// Pseudo-bold stroke radius in pixels [default: 0]
    #[arg(long)]
    stroke_width: Option<u32>,

    /// Shadow offset in pixels [default: 2 2]
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    shadow_offset: Option<Vec<i32>>,

    /// Shadow alpha, 0-255; 0 disables the shadow [default: 180]
    #[arg(long)]
    shadow_alpha: Option<u32>,

    /// Shadow Gaussian blur radius in pixels [default: 0]
    #[arg(long)]
    shadow_blur: Option<u32>,

    /// Tile pitch as multiples of the text box [default: 1.0 1.0]
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    tile_step: Option<Vec<f64>>,

    /// Extra horizontal pitch multiplier for diagonal-tile [default: 1.5]
    #[arg(long)]
    diag_step: Option<f64>,

    /// Maximum parallel workers [default: number of CPU cores]
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable the output cache: re-render every photo
    #[arg(long)]
    no_cache: bool,

    /// Print a stock watermark.toml with all options documented, then exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Flags given on the command line, as a sparse config overlay.
    fn overlay(&self) -> toml::Value {
        let mut root = toml::Table::new();
        let mut font = toml::Table::new();
        let mut stroke = toml::Table::new();
        let mut shadow = toml::Table::new();
        let mut tile = toml::Table::new();
        let mut processing = toml::Table::new();

        set(&mut root, "text", self.text.clone());
        set(&mut root, "mode", self.mode.clone());
        set(&mut root, "opacity", self.opacity);
        set(&mut root, "margin_ratio", self.margin_ratio);
        set(
            &mut font,
            "path",
            self.font.as_ref().map(|p| p.display().to_string()),
        );
        set(&mut font, "index", self.font_index);
        set(&mut font, "size", self.font_size);
        set(&mut font, "ratio", self.font_ratio);
        set(&mut font, "fit", self.fit.clone());
        set(&mut stroke, "width", self.stroke_width);
        set(&mut shadow, "offset", self.shadow_offset.clone());
        set(&mut shadow, "alpha", self.shadow_alpha);
        set(&mut shadow, "blur", self.shadow_blur);
        set(&mut tile, "step", self.tile_step.clone());
        set(&mut tile, "diag_step", self.diag_step);
        set(&mut processing, "max_processes", self.jobs.map(|n| n as i64));

        for (name, section) in [
            ("font", font),
            ("stroke", stroke),
            ("shadow", shadow),
            ("tile", tile),
            ("processing", processing),
        ] {
            if !section.is_empty() {
                root.insert(name.to_string(), toml::Value::Table(section));
            }
        }
        toml::Value::Table(root)
    }
}

fn set<T: Into<toml::Value>>(table: &mut toml::Table, key: &str, value: Option<T>) {
    if let Some(v) = value {
        table.insert(key.to_string(), v.into());
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let file_overlay = match &cli.config {
        Some(path) => Some(config::read_config_file(path)?),
        None => config::load_raw_config(&cli.dir)?,
    };
    let settings = config::resolve_config(
        config::stock_defaults_value()?,
        [file_overlay, Some(cli.overlay())],
    )?;
    let watermark = settings.watermark()?;

    let explicit_font = settings.font.path.as_deref().map(std::path::Path::new);
    let candidates = font::font_candidates(explicit_font);
    let font = font::FontResource::load_first(&candidates, settings.font.index)?;

    init_thread_pool(&settings.processing);

    let options = process::BatchOptions {
        input_dir: cli.dir.clone(),
        output_dir: cli.output.clone(),
        use_cache: !cli.no_cache,
    };
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = process::process(&options, &watermark, &font, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let summary = result?;

    output::print_summary(&summary, &cli.dir);

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
