use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use larder_ocr::{ExtractionPipeline, LoadError, OcrBackend, OcrError, PipelineError};

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Extract grocery line items from a receipt screenshot")]
#[command(version)]
struct Cli {
    /// Path to the receipt image (JPEG, PNG, WEBP, ...)
    image: PathBuf,

    /// Write debug_crop.png, debug_thresh.png and debug_ocr.txt next to the
    /// extracted items, into this directory
    #[arg(long, value_name = "DIR")]
    debug: Option<PathBuf>,

    /// Print the items as a JSON array instead of a numbered summary
    #[arg(long)]
    json: bool,

    /// Tesseract data directory (defaults to the system install)
    #[arg(long, value_name = "DIR")]
    tessdata: Option<String>,

    /// OCR language
    #[arg(long, default_value = "eng")]
    lang: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tesseract")]
fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let recognizer = larder_ocr::TesseractRecognizer::new(cli.tessdata.clone(), &cli.lang);
    extract_and_report(cli, recognizer)
}

#[cfg(not(feature = "tesseract"))]
fn run(_cli: &Cli) -> anyhow::Result<ExitCode> {
    anyhow::bail!(
        "this build has no OCR engine; rebuild with `--features tesseract` \
         (requires the Tesseract and Leptonica system libraries)"
    );
}

#[cfg_attr(not(feature = "tesseract"), allow(dead_code))]
fn extract_and_report<R: OcrBackend>(cli: &Cli, recognizer: R) -> anyhow::Result<ExitCode> {
    let mut pipeline = ExtractionPipeline::new(recognizer);
    if let Some(dir) = &cli.debug {
        std::fs::create_dir_all(dir)?;
        pipeline = pipeline.with_diagnostics(dir.clone());
    }

    let items = match pipeline.extract_from_path(&cli.image) {
        Ok(items) => items,
        Err(PipelineError::Load(e @ LoadError::FileAccess { .. })) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(PipelineError::Ocr(e @ OcrError::NotAvailable(_))) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(ExitCode::SUCCESS);
    }

    if items.is_empty() {
        println!("No items detected.");
        println!("Tips: use a sharp, well-lit screenshot of the order summary;");
        println!("crop away unrelated UI; rerun with --debug DIR to inspect");
        println!("the intermediate images and raw OCR text.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Extracted {} item(s):", items.len());
    for (n, item) in items.iter().enumerate() {
        println!(
            "{:>3}. {}  ({} x {}{})",
            n + 1,
            item.name,
            item.count,
            item.unit_value,
            item.unit
        );
    }
    Ok(ExitCode::SUCCESS)
}
