//! ofxio - convert image sequences through the generic reader and writer.
//!
//! `ofxio convert --in /shots/plate.0001.exr --out /out/plate.####.png`
//! reads every frame of the input sequence, converts it to the working
//! space, then writes it with the output file's colour space.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand, ValueEnum};
use ofxio_color::ColorSpace;
use ofxio_core::{AbortSignal, PixelComponents, RenderScale};
use ofxio_host::{choice_of, HostCapabilities, OfxStatus, ParamValue, SettingsFile, StdFileSystem};
use ofxio_media::{ImageFileReader, ImageFileWriter};
use ofxio_reader::{GenericReader, ReaderClip, ReaderSettings};
use ofxio_writer::{FrameRangeChoice, GenericWriter, WriteArgs, WriterSettings};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ofxio", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe an input file or sequence.
    Info(InfoArgs),
    /// Read a sequence and write it out again.
    Convert(ConvertArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Any frame of the sequence.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Components {
    Rgba,
    Rgb,
    Alpha,
}

impl From<Components> for PixelComponents {
    fn from(c: Components) -> Self {
        match c {
            Components::Rgba => PixelComponents::Rgba,
            Components::Rgb => PixelComponents::Rgb,
            Components::Alpha => PixelComponents::Alpha,
        }
    }
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Any frame of the input sequence.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file name; `#` runs and `%d` are replaced by the frame number.
    #[arg(long)]
    out: String,

    /// First frame to write (defaults to the input's first frame).
    #[arg(long)]
    first: Option<i32>,

    /// Last frame to write (defaults to the input's last frame).
    #[arg(long)]
    last: Option<i32>,

    /// Colour space the input files are in, when the guess is wrong.
    #[arg(long)]
    input_space: Option<String>,

    /// Colour space the output files are written in, when the guess is wrong.
    #[arg(long)]
    output_space: Option<String>,

    /// Working space between reader and writer.
    #[arg(long, default_value = "linear")]
    working_space: String,

    /// Channels to write.
    #[arg(long, value_enum)]
    components: Option<Components>,

    /// Reader settings file applied before `--in`.
    #[arg(long)]
    reader_settings: Option<PathBuf>,

    /// Writer settings file applied before the other options.
    #[arg(long)]
    writer_settings: Option<PathBuf>,

    /// Save the final reader and writer settings in this directory.
    #[arg(long)]
    save_settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Convert(args) => cmd_convert(args),
    }
}

fn open_reader(input: &Path, settings: Option<&Path>) -> anyhow::Result<GenericReader> {
    let backend = Arc::new(ImageFileReader::new());
    let fs = Arc::new(StdFileSystem);
    let caps = HostCapabilities::default();
    let mut reader = match settings {
        Some(path) => {
            let file = SettingsFile::<ReaderSettings>::load_from_file(path)
                .with_context(|| format!("load reader settings '{}'", path.display()))?;
            GenericReader::with_settings(backend, fs, caps, file.settings)?
        }
        None => GenericReader::new(backend, fs, caps),
    };
    reader
        .set_param(
            ofxio_reader::names::FILENAME,
            ParamValue::String(input.display().to_string()),
        )
        .with_context(|| format!("open '{}'", input.display()))?;
    Ok(reader)
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let reader = open_reader(&args.in_path, None)?;
    let settings = reader.settings();
    let range = reader.time_domain();
    let prefs = reader.clip_preferences()?;
    let rod = reader.region_of_definition(range.min)?;

    println!("file:         {}", settings.filename);
    println!("frames:       {} - {}", range.min, range.max);
    println!("size:         {} x {}", rod.x2 - rod.x1, rod.y2 - rod.y1);
    println!("components:   {:?}", prefs.components);
    println!("premult:      {:?}", settings.premultiplication);
    println!("colour space: {}", settings.input_colorspace);
    Ok(())
}

fn space(name: &str) -> anyhow::Result<ColorSpace> {
    Ok(ColorSpace::from_name(name)?)
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    use ofxio_reader::names as rn;
    use ofxio_writer::names as wn;

    let mut reader = open_reader(&args.in_path, args.reader_settings.as_deref())?;
    if let Some(name) = &args.input_space {
        reader.set_param(rn::INPUT_COLORSPACE, ParamValue::String(space(name)?.name().into()))?;
    }
    let working = space(&args.working_space)?;
    reader.set_param(rn::OUTPUT_COLORSPACE, ParamValue::String(working.name().into()))?;

    let backend = Arc::new(ImageFileWriter::new());
    let caps = HostCapabilities::default();
    let mut writer = match &args.writer_settings {
        Some(path) => {
            let file = SettingsFile::<WriterSettings>::load_from_file(path)
                .with_context(|| format!("load writer settings '{}'", path.display()))?;
            GenericWriter::with_settings(backend, caps, file.settings)?
        }
        None => GenericWriter::new(backend, caps),
    };
    writer.set_param(wn::FILENAME, ParamValue::String(args.out.clone()))?;
    writer.set_param(wn::INPUT_COLORSPACE, ParamValue::String(working.name().into()))?;
    if let Some(name) = &args.output_space {
        writer.set_param(wn::OUTPUT_COLORSPACE, ParamValue::String(space(name)?.name().into()))?;
    }
    if let Some(components) = args.components {
        let index = choice_of(&ofxio_writer::settings::COMPONENT_CHOICES, components.into());
        writer.set_param(wn::OUTPUT_COMPONENTS, ParamValue::Choice(index))?;
    }
    if args.first.is_some() || args.last.is_some() {
        let input = reader.time_domain();
        let first = args.first.unwrap_or(input.min as i32);
        let last = args.last.unwrap_or(input.max as i32);
        if first > last {
            bail!("first frame {first} is after last frame {last}");
        }
        let manual = choice_of(&FrameRangeChoice::ALL, FrameRangeChoice::Manual);
        writer.set_param(wn::FRAME_RANGE, ParamValue::Choice(manual))?;
        writer.set_param(wn::LAST_FRAME, ParamValue::Int(last))?;
        writer.set_param(wn::FIRST_FRAME, ParamValue::Int(first))?;
    }

    if let Some(dir) = &args.save_settings {
        std::fs::create_dir_all(dir)?;
        reader.settings().to_file().save_to_file(&dir.join("reader.json"))?;
        writer.settings().to_file().save_to_file(&dir.join("writer.json"))?;
        info!(dir = %dir.display(), "settings saved");
    }

    let clip = ReaderClip::new(&reader);
    let range = writer.frame_range(&clip, reader.time_domain());
    let abort = AbortSignal::new();
    let (first, last) = (range.min.round() as i64, range.max.round() as i64);
    info!(first, last, "converting");

    for frame in first..=last {
        let time = frame as f64;
        let prefs = reader.clip_preferences()?;
        let window = reader
            .region_of_definition(time)?
            .to_pixel_enclosing(RenderScale::FULL, prefs.pixel_aspect_ratio);
        if window.is_empty() {
            debug!(frame, "black frame skipped");
            continue;
        }
        let status = writer.render(&WriteArgs::new(time, window, &abort), &clip);
        if status != OfxStatus::Ok {
            let text = writer
                .message()
                .get()
                .map(|(_, text)| text)
                .unwrap_or_default();
            bail!("frame {frame}: {text}");
        }
        info!(frame, file = %writer.filename_at(time, "Main").display(), "written");
    }

    writer.purge_caches();
    reader.purge_caches();
    Ok(())
}
