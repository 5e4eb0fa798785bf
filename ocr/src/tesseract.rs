use crate::OcrResult;
use crate::engine::OcrEngine;
use crate::result::{BoundingBox, TextMatch, confidence_from_percent};
use anyhow::Context;
use image::DynamicImage;
use std::io::Cursor;
use tesseract::Tesseract;

/// Tesseract backend with word-level boxes and confidences.
///
/// Good for clean text; requires the Tesseract native library and language
/// data on the system. Word geometry and confidence come from the TSV
/// output, whose native 0–100 confidence scale is normalized to `[0, 1]`.
pub struct TesseractEngine {
    lang: String,
    datapath: Option<String>,
}

impl TesseractEngine {
    /// Build an engine for the given language code (e.g. `"eng"`).
    ///
    /// Fails fatally when the language data cannot be loaded, so a broken
    /// installation surfaces at construction instead of on the first frame.
    pub fn new(lang: &str, datapath: Option<&str>) -> OcrResult<Self> {
        Tesseract::new(datapath, Some(lang))
            .with_context(|| format!("failed to initialize tesseract for language {lang:?}"))?;
        tracing::info!(lang, "tesseract engine initialized");
        Ok(Self {
            lang: lang.to_string(),
            datapath: datapath.map(str::to_string),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn extract_text(
        &mut self,
        frame: &DynamicImage,
        min_confidence: f32,
    ) -> OcrResult<Vec<TextMatch>> {
        let mut png = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .context("failed to encode frame for tesseract")?;

        // The Tesseract handle is consumed by the builder-style API, so a
        // fresh instance is created per frame.
        let mut tess = Tesseract::new(self.datapath.as_deref(), Some(&self.lang))
            .context("failed to initialize tesseract")?
            .set_image_from_mem(&png)
            .context("tesseract rejected the frame")?
            .recognize()
            .context("tesseract recognition failed")?;

        let tsv = tess
            .get_tsv_text(0)
            .context("failed to read tesseract tsv output")?;

        let matches = parse_tsv(&tsv, min_confidence);
        tracing::debug!(regions = matches.len(), "tesseract extraction finished");
        Ok(matches)
    }
}

/// Parse Tesseract TSV output into word-level matches.
///
/// Columns: level, page, block, paragraph, line, word, left, top, width,
/// height, conf, text. Rows with conf < 0 are structural (page/block/line)
/// and carry no recognized word.
fn parse_tsv(tsv: &str, min_confidence: f32) -> Vec<TextMatch> {
    let mut matches = Vec::new();

    for line in tsv.lines() {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let Ok(conf) = cols[10].parse::<f32>() else {
            continue; // header row
        };
        let text = cols[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let geometry: Option<Vec<u32>> = cols[6..10].iter().map(|c| c.parse().ok()).collect();
        let Some(g) = geometry else {
            continue;
        };

        let confidence = confidence_from_percent(conf);
        if confidence < min_confidence {
            continue;
        }

        matches.push(TextMatch::new(
            text,
            confidence,
            BoundingBox::new(g[0], g[1], g[2], g[3]),
        ));
    }

    matches
}
