use anyhow::{Result, bail};
use automation::{Automator, AutomatorConfig};
use clap::Parser;
use ocr::OcrEngine;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tap on-screen text over a WebDriverAgent endpoint.
#[derive(Parser, Debug)]
#[command(name = "automation", version, about = "Text-driven device automation")]
struct Args {
    /// WebDriverAgent URL
    #[arg(long, default_value = wda_client::DEFAULT_WDA_URL)]
    wda_url: String,

    /// App bundle id to launch before interacting
    #[arg(long)]
    bundle_id: Option<String>,

    /// Text labels to wait for and tap, in order
    #[arg(required = true)]
    targets: Vec<String>,

    /// Per-target wait timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// OCR language (tesseract backend)
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Directory with PP-OCR models (paddle backend); when set, the
    /// paddle backend is used instead of tesseract
    #[arg(long)]
    paddle_models: Option<std::path::PathBuf>,
}

fn build_engine(args: &Args) -> Result<Box<dyn OcrEngine>> {
    #[cfg(feature = "paddle")]
    if let Some(dir) = &args.paddle_models {
        let config = ocr::ModelConfig::new(
            dir.join("PP-OCRv5_mobile_det.mnn"),
            dir.join("PP-OCRv5_mobile_rec.mnn"),
            dir.join("ppocr_keys_v5.txt"),
        );
        return Ok(Box::new(ocr::PaddleEngine::new(config)?));
    }
    #[cfg(not(feature = "paddle"))]
    if args.paddle_models.is_some() {
        bail!("built without the `paddle` feature");
    }

    #[cfg(feature = "tesseract")]
    return Ok(Box::new(ocr::TesseractEngine::new(&args.lang, None)?));

    #[cfg(not(feature = "tesseract"))]
    {
        let _ = &args.lang;
        bail!("built without an OCR backend; enable the `tesseract` or `paddle` feature")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let engine = build_engine(&args)?;
    let config = AutomatorConfig {
        wait_timeout: Duration::from_secs(args.timeout),
        ..AutomatorConfig::default()
    };

    let mut auto = Automator::over_wda(&args.wda_url, engine, config)?;
    auto.run_session(|auto| {
        if let Some(bundle_id) = &args.bundle_id {
            auto.launch_app(bundle_id)?;
        }
        for target in &args.targets {
            if auto.tap_text(target)? {
                info!(target, "tapped");
            } else {
                bail!("never saw {target:?} on screen");
            }
        }
        Ok(())
    })
}
