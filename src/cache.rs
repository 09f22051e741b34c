//! 検出結果キャッシュモジュール
//!
//! 画像内容のSHA-256ハッシュをキーにして検出結果をキャッシュし、
//! 同じ画像の再検出（ラベラー呼び出し）をスキップする。

use crate::detector::{FoodDetector, ImageDetection};
use crate::error::Result;
use crate::scanner::ImageInfo;
use chrono::{DateTime, Utc};
use food_detect_common::DetectionResult;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_FILE_NAME: &str = ".food-detect-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// ファイルハッシュ → 検出結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub file_size: u64,
    pub detected_at: DateTime<Utc>,
    pub result: DetectionResult,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（存在しない・破損時は空）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "キャッシュ破損、再生成します");
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// キャッシュファイルを削除。存在しなければ `false`
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, hash: &str) -> Option<&DetectionResult> {
        self.entries.get(hash).map(|e| &e.result)
    }

    pub fn insert(&mut self, hash: String, file_name: String, file_size: u64, result: DetectionResult) {
        self.entries.insert(
            hash,
            CacheEntry {
                file_name,
                file_size,
                detected_at: Utc::now(),
                result,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// 既定のキャッシュ保存先（最初の入力がフォルダならそのフォルダ、画像なら親フォルダ）
pub fn default_cache_dir(paths: &[PathBuf]) -> PathBuf {
    match paths.first() {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => PathBuf::from("."),
    }
}

/// 画像ファイルのハッシュを計算（SHA-256）
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// キャッシュ済み・未キャッシュの画像に振り分ける
///
/// - キャッシュにある画像は (入力位置, 結果)
/// - ない画像は (入力位置, 画像, ハッシュ)。ハッシュ計算に失敗した場合は空文字
pub fn filter_cached_images(
    images: &[ImageInfo],
    cache: &CacheFile,
) -> (Vec<(usize, ImageDetection)>, Vec<(usize, ImageInfo, String)>) {
    let mut cached = Vec::new();
    let mut uncached = Vec::new();

    for (idx, img) in images.iter().enumerate() {
        let hash = match compute_file_hash(&img.path) {
            Ok(h) => h,
            Err(_) => {
                uncached.push((idx, img.clone(), String::new()));
                continue;
            }
        };

        match cache.get(&hash) {
            Some(result) => cached.push((
                idx,
                ImageDetection {
                    file_name: img.file_name.clone(),
                    file_path: img.path.display().to_string(),
                    result: result.clone(),
                    degraded: false,
                },
            )),
            None => uncached.push((idx, img.clone(), hash)),
        }
    }

    (cached, uncached)
}

/// キャッシュを使って一括検出し、新しい結果をキャッシュに保存する
pub async fn detect_with_cache(
    detector: &FoodDetector,
    images: &[ImageInfo],
    cache_dir: &Path,
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Result<Vec<ImageDetection>> {
    let mut cache = CacheFile::load(cache_dir);
    let (cached, uncached) = filter_cached_images(images, &cache);
    debug!(cached = cached.len(), uncached = uncached.len(), "キャッシュ照合");

    if let Some(pb) = progress {
        pb.inc(cached.len() as u64);
    }

    let targets: Vec<ImageInfo> = uncached.iter().map(|(_, img, _)| img.clone()).collect();
    let fresh = detector.detect_many(&targets, concurrency, progress).await;

    let mut slots: Vec<Option<ImageDetection>> = vec![None; images.len()];
    for (idx, detection) in cached {
        slots[idx] = Some(detection);
    }
    for ((idx, img, hash), detection) in uncached.into_iter().zip(fresh) {
        // ラベラー失敗・デコード失敗の結果は次回に再判定する
        if !hash.is_empty() && !detection.degraded {
            let file_size = std::fs::metadata(&img.path).map(|m| m.len()).unwrap_or(0);
            cache.insert(hash, img.file_name.clone(), file_size, detection.result.clone());
        }
        slots[idx] = Some(detection);
    }

    cache.save(cache_dir)?;

    Ok(slots.into_iter().flatten().collect())
}
