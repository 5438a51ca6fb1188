use std::fs::{self, File};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::Rgba;
use log::{info, warn};
use simplelog::{Config, WriteLogger};

use pdfraster::pdf::flatten;
use pdfraster::settings::Settings;
use pdfraster::{AuthenticationStatus, PdfDocument, ScaleRequest};

const LOG_FILE: &str = "pdfraster.log";

/// Rasterize PDF pages to PNG, optionally highlighting search hits
#[derive(Parser, Debug)]
#[command(name = "pdfraster")]
#[command(version, about, long_about = None)]
struct Args {
    /// PDF file to render
    file: PathBuf,

    /// Render resolution in dots per inch
    #[arg(long, conflicts_with = "fit")]
    dpi: Option<f32>,

    /// Fit each page into WIDTHxHEIGHT pixels
    #[arg(long, value_name = "WxH", value_parser = parse_fit)]
    fit: Option<(f32, f32)>,

    /// Text to search for and highlight
    #[arg(short, long, default_value = "")]
    search: String,

    /// Maximum number of hits reported per page
    #[arg(long)]
    max_hits: Option<usize>,

    /// Number of pages to render from the start of the document
    #[arg(long, default_value_t = 3)]
    pages: usize,

    /// Password for encrypted documents
    #[arg(long)]
    password: Option<String>,

    /// Print the table of contents
    #[arg(long)]
    toc: bool,

    /// Settings file (defaults to $PDFRASTER_CONFIG or the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for rendered pages
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn parse_fit(value: &str) -> Result<(f32, f32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width: f32 = width.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let height: f32 = height.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((width, height))
}

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::discover()?,
    };

    WriteLogger::init(
        settings.level_filter(),
        Config::default(),
        File::create(LOG_FILE).context("unable to create log file")?,
    )?;

    info!("Starting pdfraster on {:?}", args.file);
    run(&args, &settings)
}

fn run(args: &Args, settings: &Settings) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("unable to read {:?}", args.file))?;

    let started = Instant::now();
    let doc = PdfDocument::open(&bytes, settings.cache_limit())
        .with_context(|| format!("unable to open {:?}", args.file))?;
    println!("opened in {:?}", started.elapsed());

    if doc.requires_authentication()? {
        let password = args.password.as_deref().unwrap_or_default();
        let status = doc.authenticate(password)?;
        if !status.is_authenticated() {
            bail!("document is password protected; pass --password");
        }
        if status.contains(AuthenticationStatus::OWNER_AUTHENTICATED) {
            info!("Authenticated as owner");
        }
    }

    let dpi = args.dpi.unwrap_or(settings.dpi);
    if args.toc {
        print_toc(&doc, dpi)?;
    }

    let request = match args.fit {
        Some((max_width, max_height)) => ScaleRequest::Fit {
            max_width,
            max_height,
        },
        None => ScaleRequest::Dpi(dpi),
    };
    let max_hits = args.max_hits.unwrap_or(settings.max_hits);
    let out_dir = args.out.clone().unwrap_or_else(|| settings.output_dir.clone());
    fs::create_dir_all(&out_dir).with_context(|| format!("unable to create {out_dir:?}"))?;

    let highlight = Rgba(settings.highlight);
    let page_count = doc.page_count()?;
    let mut slowest = Duration::ZERO;

    for page in 0..args.pages.min(page_count) {
        let started = Instant::now();
        let mut rendered = doc.render(page, request, max_hits, &args.search)?;
        let elapsed = started.elapsed();
        slowest = slowest.max(elapsed);

        println!(
            "page {page}: {}x{} px, {} hits, {} links in {elapsed:?}",
            rendered.width(),
            rendered.height(),
            rendered.search_hits.len(),
            rendered.links.len()
        );
        for link in &rendered.links {
            println!("  link {:?} -> page {} {}", link.bounds, link.page_number(), link.uri());
        }

        rendered.highlight_hits(highlight);
        let path = out_dir.join(format!("img-{page}.png"));
        if let Err(e) = rendered.into_image().save(&path) {
            warn!("Failed to write {path:?}: {e}");
            eprintln!("unable to write {path:?}: {e}");
        }
    }

    println!("slowest page: {slowest:?}");
    doc.release();
    info!("Done");
    Ok(())
}

fn print_toc(doc: &PdfDocument, dpi: f32) -> Result<()> {
    let toc = doc.table_of_contents(dpi)?;
    if toc.is_empty() {
        println!("(no outline)");
        return Ok(());
    }
    for entry in flatten(&toc) {
        let page = entry
            .page_number
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:?} page {page} at ({}, {})",
            entry.title, entry.page_x, entry.page_y
        );
    }
    Ok(())
}
