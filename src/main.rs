//! Entry point for the **scrubline** replay tool.
//!
//! Reads newline-delimited JSON host events from a file (or stdin), replays
//! them against the landing page scene and prints every surface write as one
//! JSON line on stdout.
//!
//! ```text
//! scrubline [EVENTS|-] [--layout FILE] [--config FILE] [--title 5,4,6,5] [--strict]
//! ```
//!
//! Without `--layout` the document is laid out from the viewport, and laid
//! out again on every resize.

use clap::Parser;
use log::{error, info, warn};
use scrubline::config::Config;
use scrubline::event::{ElementRef, HostEvent, Viewport};
use scrubline::layout::StaticLayout;
use scrubline::record::{RecordingSurface, SurfaceWrite};
use scrubline::scenes::{default_layout, landing_page, ElementTable};
use scrubline::shader::{NullBackend, ShaderBackground};
use scrubline::source::{JsonLinesSource, SourceError};
use scrubline::stage::Stage;
use scrubline::traits::EventSource;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

//  Arguments

/// Replay host events against the landing page and print every surface
/// write as a JSON line.
#[derive(Debug, Parser)]
#[command(name = "scrubline", version, about, long_about = None)]
struct Args {
    /// Events file, one JSON event per line; `-` or nothing reads stdin.
    events: Option<PathBuf>,

    /// Element rects as JSON, keyed by element name.  Without it the page
    /// is laid out from the viewport on every resize.
    #[arg(long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// Config file (default: `$XDG_CONFIG_HOME/scrubline/config.json`).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Character count of each hero title line.
    #[arg(long, value_delimiter = ',', default_values_t = [5, 4, 6, 5])]
    title: Vec<usize>,

    /// Stop at the first malformed event line.
    #[arg(long)]
    strict: bool,
}

impl Args {
    /// The events file, `None` for stdin.
    fn events_path(&self) -> Option<&Path> {
        self.events.as_deref().filter(|p| *p != Path::new("-"))
    }
}

//  Output

/// One printed line: a surface write plus the name of the element it
/// targets.
#[derive(Serialize)]
struct Record<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<&'a str>,
    #[serde(flatten)]
    write: &'a SurfaceWrite,
}

fn target_of(write: &SurfaceWrite) -> Option<ElementRef> {
    match write {
        SurfaceWrite::Style { target, .. }
        | SurfaceWrite::Clear { target }
        | SurfaceWrite::Hint { target, .. }
        | SurfaceWrite::Pin { target, .. }
        | SurfaceWrite::Text { target, .. } => Some(*target),
        SurfaceWrite::Scroll { .. } => None,
    }
}

fn print_writes(
    out: &mut impl Write,
    surface: &mut RecordingSurface,
    elements: &ElementTable,
) -> io::Result<()> {
    for write in surface.drain() {
        let record = Record {
            element: target_of(&write).and_then(|t| elements.name_of(t)),
            write: &write,
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Print what unmounting wrote and flush.
fn finish(
    out: &mut impl Write,
    surface: &mut RecordingSurface,
    elements: &ElementTable,
) -> io::Result<()> {
    print_writes(out, surface, elements)?;
    out.flush()
}

//  Main

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(code) = run(args) {
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<(), i32> {
    let config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| {
            error!("{}", e);
            1
        })?,
        None => Config::load_default(),
    };

    let scene = landing_page(&config, &args.title).map_err(|e| {
        error!("failed to build scene: {}", e);
        1
    })?;
    let elements = scene.elements.clone();
    let title = scene.title.clone();

    let fixed_layout = match &args.layout {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                error!("failed to read {}: {}", path.display(), e);
                1
            })?;
            let layout = StaticLayout::from_named_json(&json, &elements).map_err(|e| {
                error!("failed to parse {}: {}", path.display(), e);
                1
            })?;
            Some(layout)
        }
        None => None,
    };
    let mut layout = fixed_layout
        .clone()
        .unwrap_or_else(|| default_layout(&elements, &title, Viewport::default()));

    let shader = match ShaderBackground::new(NullBackend, &config.shader) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("running without shader background: {}", e);
            None
        }
    };
    let mut stage = Stage::new(scene, shader);

    let (tx, rx) = mpsc::channel::<HostEvent>();
    let reader = spawn_source(&args, tx).map_err(|e| {
        error!("{}", e);
        1
    })?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut surface = RecordingSurface::new();
    stage.mount(&layout, &mut surface);

    let mut events = 0usize;
    let mut output_closed = false;
    for event in rx {
        if let HostEvent::Resize { width, height } = event {
            let viewport = Viewport::new(width, height);
            match &fixed_layout {
                Some(_) => layout.set_viewport(viewport),
                None => layout = default_layout(&elements, &title, viewport),
            }
        }
        stage.handle(&event, &layout, &mut surface);
        events += 1;
        if let Err(e) = print_writes(&mut out, &mut surface, &elements) {
            // Usually a closed pipe; nothing left to report to.
            info!("output closed: {}", e);
            output_closed = true;
            break;
        }
    }

    stage.unmount(&mut surface);
    info!("replayed {} events", events);
    if output_closed {
        // The reader may be blocked on stdin; nobody is waiting for it.
        return Ok(());
    }
    if let Err(e) = finish(&mut out, &mut surface, &elements) {
        error!("failed to write output: {}", e);
        return Err(1);
    }

    match reader.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("event source error: {}", e);
            Err(1)
        }
        Err(_) => {
            error!("event source thread panicked");
            Err(1)
        }
    }
}

//  Helpers

type SourceHandle = std::thread::JoinHandle<Result<(), SourceError>>;

fn spawn_source(args: &Args, tx: mpsc::Sender<HostEvent>) -> Result<SourceHandle, SourceError> {
    let strict = args.strict;
    let handle = match args.events_path() {
        Some(path) => {
            let mut source = JsonLinesSource::open(path)?;
            if strict {
                source = source.strict();
            }
            info!("reading events from {}", path.display());
            std::thread::spawn(move || source.run(tx))
        }
        None => {
            let mut source = JsonLinesSource::stdin();
            if strict {
                source = source.strict();
            }
            info!("reading events from stdin");
            std::thread::spawn(move || source.run(tx))
        }
    };
    Ok(handle)
}
