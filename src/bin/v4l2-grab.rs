//! Grabs frames from a V4L2 device into a raw file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::{error, info};

use v4l2_capture::{Config, Frame, Session, Sink, StreamFormat};

/// Grab frames from a Video4Linux2 capture device
#[derive(Parser, Debug)]
#[command(name = "v4l2-grab", version, about)]
struct Args {
    /// Device locator, e.g. v4l2:///dev/video0:chroma=YUYV:width=640:height=480
    #[arg(default_value = "v4l2:///dev/video0")]
    locator: String,

    /// Number of frames to grab
    #[arg(short = 'n', long, default_value_t = 10)]
    frames: u64,

    /// Raw output file; frames are only counted when missing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the device controls and exit
    #[arg(long)]
    list_controls: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default();
    let env = if quiet {
        env.default_filter_or("error")
    } else if verbose {
        env.default_filter_or("debug")
    } else {
        env.default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Writes every frame back to back
struct RawFile<W: Write> {
    out: Option<W>,
    frames: u64,
    bytes: u64,
    error: Option<io::Error>,
}

impl<W: Write> RawFile<W> {
    fn new(out: Option<W>) -> Self {
        RawFile {
            out,
            frames: 0,
            bytes: 0,
            error: None,
        }
    }
}

impl<W: Write> Sink for RawFile<W> {
    fn open_stream(&mut self, format: &StreamFormat) {
        println!("Stream      : {}", format);
    }

    fn deliver(&mut self, frame: Frame) {
        self.frames += 1;
        self.bytes += frame.len() as u64;
        if self.error.is_some() {
            return;
        }
        if let Some(out) = self.out.as_mut() {
            if let Err(e) = out.write_all(&frame.data) {
                self.error = Some(e);
            }
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config: Config = args.locator.parse()?;
    let mut session = Session::open(&config)?;

    let probe = session.probe();
    print!("{}", probe.caps);
    println!("I/O method  : {}", session.io_method());
    println!("Buffers     : {}", session.buffer_count());
    if let Some(std) = session.standard() {
        println!("Standard    : {}", std);
    }

    if args.list_controls {
        println!();
        for var in session.controls() {
            println!("{}", var);
        }
        return Ok(());
    }

    let out = match &args.output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };
    let mut sink = RawFile::new(out);

    let start = Instant::now();
    while sink.frames < args.frames {
        if !session.demux(&mut sink)? {
            break;
        }
        if let Some(e) = sink.error.take() {
            return Err(e.into());
        }
    }
    session.close();

    if let Some(out) = sink.out.as_mut() {
        out.flush()?;
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "grabbed {} frames ({} bytes) in {:.2} s, {:.1} fps",
        sink.frames,
        sink.bytes,
        elapsed,
        sink.frames as f64 / elapsed.max(f64::EPSILON)
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
