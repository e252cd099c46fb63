use clap::{Parser, Subcommand};
use rasterkit::imaging::{Codec, Compression, Image, ImageBackend, Quality, RustBackend};
use rasterkit::{batch, config, demo, output, steps};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "rasterkit")]
#[command(about = "Decode, inspect, transform and re-encode raster images")]
#[command(long_about = "\
Decode, inspect, transform and re-encode raster images

Reads TIFF, JPEG, PNG, WebP, BMP and PNM. Writes all of those plus AVIF.
The output codec follows the file extension unless --codec is given.

Transform steps are applied in order, each written as one argument:

  rotate <degrees>                 clockwise; quarter turns are exact
  scale <fx> [fy]                  picks a filter from the factors
  nearest-scale | bilinear-scale | box-scale | thumbnail-scale <fx> [fy]
  flip-x | flip-y
  crop <x> <y> <width> <height>
  auto-crop                        drop uniform rows at the bottom
  resize <width> <height>          canvas size, content kept top-left
  resolution <x-dpi> [y-dpi]
  colorspace <gray8|rgb8|rgba16|...>
  invert | normalize
  bcg <brightness> <contrast> <gamma>
  hsl <hue-degrees> <saturation> <lightness>

Example:

  rasterkit convert scan.tif scan.jpg --quality 85 \\
      --step 'rotate 90' --step 'box-scale 0.5'

Run 'rasterkit gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file merged over the stock defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print an image's size, resolution and pixel layout
    Info {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Also report whether the page is empty: fewer than PERCENT dark pixels
        #[arg(long, value_name = "PERCENT")]
        empty_page: Option<f64>,
        /// Border ignored by --empty-page, in pixels (rounded down to a multiple of 8)
        #[arg(long, default_value_t = 16)]
        margin: u32,
    },
    /// Decode one image, apply steps, encode it
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Run the decode, inspect, transform, encode walkthrough on two TIFFs
    Demo {
        /// Decoded from disk and written as test.jpg
        first: PathBuf,
        /// Decoded from memory, transformed, written as memory.jpg
        second: PathBuf,
        /// Where test.jpg and memory.jpg are written
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// JPEG quality
        #[arg(long, default_value_t = demo::DEMO_QUALITY)]
        quality: u32,
    },
    /// Convert every image under a directory
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

/// Encoder and transform flags shared by `convert` and `batch`.
#[derive(clap::Args, Clone)]
struct EncodeArgs {
    /// Output codec (jpeg, png, tiff, webp, bmp, pnm, avif)
    #[arg(long)]
    codec: Option<Codec>,
    /// Lossy quality, 1-100
    #[arg(long)]
    quality: Option<u32>,
    /// TIFF/PNG compression (none, lzw, deflate, packbits, fast, best)
    #[arg(long)]
    compression: Option<Compression>,
    /// Transform step, repeatable; runs after the config's steps
    #[arg(long = "step", value_name = "STEP")]
    steps: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Info {
            file,
            json,
            empty_page,
            margin,
        } => {
            let mut image = Image::new();
            image.decode_file(&file)?;
            let info = image.info();
            let page = empty_page.map(|threshold| {
                let ink_percent = image.ink_percent(margin);
                output::PageCheck {
                    ink_percent,
                    threshold,
                    empty: ink_percent < threshold,
                }
            });
            if json {
                println!("{}", output::format_info_json(&info, page.as_ref())?);
            } else {
                output::print_info(&info, &file, page.as_ref());
            }
        }
        Command::Convert {
            input,
            output: out,
            encode,
        } => {
            let mut all_steps = config.transform.steps.clone();
            all_steps.extend(config::parse_steps(&encode.steps)?);

            let backend = RustBackend::new();
            let mut image = backend.decode_file(&input)?;
            steps::apply_all(&all_steps, &mut image, config.transform.background)?;

            let mut options = config.encode.options();
            if let Some(codec) = encode.codec {
                options.codec = Some(codec);
            }
            if let Some(quality) = encode.quality {
                options.quality = Quality::new(quality);
            }
            if let Some(compression) = encode.compression {
                options.compression = compression;
            }
            backend.encode_file(&image, &out, &options)?;
            output::print_info(&image.info(), &out, None);
        }
        Command::Demo {
            first,
            second,
            out_dir,
            quality,
        } => {
            let mut options = demo::DemoOptions::new(first, second);
            options.out_dir = out_dir;
            options.quality = Quality::new(quality);
            options.background = config.transform.background;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_demo_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = demo::run(&options, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            output::print_demo_report(&result?);
        }
        Command::Batch {
            input_dir,
            output_dir,
            encode,
        } => {
            init_thread_pool(&config.processing);

            let mut all_steps = config.transform.steps.clone();
            all_steps.extend(config::parse_steps(&encode.steps)?);
            let mut options = config.encode.options();
            if let Some(quality) = encode.quality {
                options.quality = Quality::new(quality);
            }
            if let Some(compression) = encode.compression {
                options.compression = compression;
            }
            let options = batch::BatchOptions {
                input_dir: input_dir.clone(),
                output_dir,
                codec: encode.codec.or(config.encode.codec).unwrap_or(Codec::Jpeg),
                encode: options,
                steps: all_steps,
                background: config.transform.background,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event, &input_dir) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::run(&options, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            let report = result?;
            output::print_batch_summary(&report);
            if !report.failed.is_empty() {
                return Err(format!("{} of the images failed", report.failed.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
