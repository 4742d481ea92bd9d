use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgcodecs, imgcodecs::IMREAD_GRAYSCALE};
use tracing::{info, warn};

use crate::vision::FrameSource;

#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub timestamp_ns: u64,
    pub filename: String,
}

/// Recorded grayscale image sequence in EuRoC camera layout:
///
/// ```text
/// <dir>/data.csv      #timestamp [ns],filename
/// <dir>/data/<filename>
/// ```
#[derive(Debug)]
pub struct ImageSequence {
    image_dir: PathBuf,
    entries: Vec<ImageEntry>,
    cursor: usize,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = load_image_list(dir.join("data.csv"))?;
        if entries.is_empty() {
            bail!("No images listed in {}", dir.join("data.csv").display());
        }
        info!("Loaded {} image entries from {}", entries.len(), dir.display());

        Ok(Self {
            image_dir: dir.join("data"),
            entries,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FrameSource for ImageSequence {
    type Image = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        while let Some(entry) = self.entries.get(self.cursor) {
            self.cursor += 1;
            let path = self.image_dir.join(&entry.filename);
            let path_str = path
                .to_str()
                .with_context(|| format!("Non UTF-8 image path {:?}", path))?;
            let image = imgcodecs::imread(path_str, IMREAD_GRAYSCALE)
                .with_context(|| format!("Failed to read image {:?}", path))?;
            if image.empty() {
                warn!("Skipping unreadable image {:?}", path);
                continue;
            }
            return Ok(Some(image));
        }
        Ok(None)
    }
}

fn load_image_list(csv_path: PathBuf) -> Result<Vec<ImageEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 2 {
            continue;
        }
        let ts: u64 = rec[0].trim().parse()?;
        let filename = rec[1].trim().to_string();
        entries.push(ImageEntry {
            timestamp_ns: ts,
            filename,
        });
    }
    Ok(entries)
}
