//! キャッシュ機能テスト
//!
//! 検出結果キャッシュの動作を検証

use food_detect::cache::{
    compute_file_hash, default_cache_dir, detect_with_cache, filter_cached_images, CacheFile,
};
use async_trait::async_trait;
use food_detect::error::{FoodDetectError, Result};
use food_detect::oracle::{LabelOracle, StaticOracle};
use food_detect::scanner::ImageInfo;
use food_detect::{DetectionResult, DetectorConfig, FoodDetector, KnowledgeBase, LabelCandidate};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn banana() -> DetectionResult {
    DetectionResult {
        name: "Banana".to_string(),
        confidence: 1.35,
        alternatives: vec![],
    }
}

/// 常にタイムアウトするラベラー
struct TimeoutOracle;

#[async_trait]
impl LabelOracle for TimeoutOracle {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn labels(&self, _image: &Path, _floor: f64) -> Result<Vec<LabelCandidate>> {
        Err(FoodDetectError::OracleTimeout(30))
    }
}

/// 空のキャッシュファイル
#[test]
fn test_cache_file_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = CacheFile::load(dir.path());

    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

/// キャッシュの保存と読み込み
#[test]
fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");

    let mut cache = CacheFile::load(dir.path());
    cache.insert("abc123".to_string(), "lunch.jpg".to_string(), 1024, banana());
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    let loaded = CacheFile::load(dir.path());
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.get("abc123"), Some(&banana()));
}

/// キャッシュの上書き
#[test]
fn test_cache_overwrite() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut cache = CacheFile::load(dir.path());

    cache.insert("same".to_string(), "a.jpg".to_string(), 10, DetectionResult::empty());
    cache.insert("same".to_string(), "a.jpg".to_string(), 10, banana());

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("same").unwrap().name, "Banana");
}

/// キャッシュファイルが破損している場合
#[test]
fn test_cache_corrupted_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(CacheFile::cache_path(dir.path()), "{ invalid json }").unwrap();

    let cache = CacheFile::load(dir.path());
    assert!(cache.is_empty());
}

/// バージョン不一致のキャッシュは破棄
#[test]
fn test_cache_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(
        CacheFile::cache_path(dir.path()),
        r#"{"version": 99, "entries": {}}"#,
    )
    .unwrap();

    assert!(CacheFile::load(dir.path()).is_empty());
}

/// キャッシュ削除
#[test]
fn test_cache_clear() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert!(!CacheFile::clear(dir.path()).unwrap());

    CacheFile::default().save(dir.path()).unwrap();
    assert!(CacheFile::clear(dir.path()).unwrap());
    assert!(!CacheFile::cache_path(dir.path()).exists());
}

/// ハッシュは内容で決まる
#[test]
fn test_file_hash_by_content() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    let c = dir.path().join("c.jpg");
    std::fs::write(&a, b"same bytes").unwrap();
    std::fs::write(&b, b"same bytes").unwrap();
    std::fs::write(&c, b"other bytes").unwrap();

    let ha = compute_file_hash(&a).unwrap();
    assert_eq!(ha.len(), 64);
    assert_eq!(ha, compute_file_hash(&b).unwrap());
    assert_ne!(ha, compute_file_hash(&c).unwrap());
}

/// filter_cached_imagesのテスト
#[test]
fn test_filter_cached_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    let img1 = dir.path().join("img1.jpg");
    let img2 = dir.path().join("img2.jpg");
    std::fs::write(&img1, b"fake image 1").unwrap();
    std::fs::write(&img2, b"fake image 2").unwrap();

    let images = vec![ImageInfo::from_path(&img1), ImageInfo::from_path(&img2)];

    let mut cache = CacheFile::load(dir.path());
    cache.insert(compute_file_hash(&img2).unwrap(), "img2.jpg".into(), 12, banana());

    let (cached, uncached) = filter_cached_images(&images, &cache);
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].0, 1);
    assert_eq!(cached[0].1.result, banana());
    assert_eq!(uncached.len(), 1);
    assert_eq!(uncached[0].0, 0);
    assert!(!uncached[0].2.is_empty());
}

/// 2回目はキャッシュから返り、ラベラーの結果が変わっても同じ結果になる
#[tokio::test]
async fn test_detect_with_cache_reuses_results() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fruit.png");
    RgbImage::from_pixel(10, 10, Rgb([128, 128, 128]))
        .save(&path)
        .unwrap();
    let images = vec![ImageInfo::from_path(&path)];
    let kb = Arc::new(KnowledgeBase::builtin());

    let first = FoodDetector::new(
        kb.clone(),
        Arc::new(StaticOracle::new(vec![LabelCandidate::new("banana", 0.9)])),
        DetectorConfig::default(),
    );
    let results = detect_with_cache(&first, &images, dir.path(), 2, None).await.unwrap();
    assert_eq!(results[0].result.name, "Banana");
    assert_eq!(CacheFile::load(dir.path()).len(), 1);

    let second = FoodDetector::new(
        kb,
        Arc::new(StaticOracle::new(vec![LabelCandidate::new("pizza", 0.9)])),
        DetectorConfig::default(),
    );
    let results = detect_with_cache(&second, &images, dir.path(), 2, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].result.name, "Banana");
    assert_eq!(results[0].file_name, "fruit.png");
}

/// ラベラーが失敗した結果はキャッシュせず、次回に再判定する
#[tokio::test]
async fn test_detect_with_cache_skips_oracle_failure() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("lunch.png");
    RgbImage::from_pixel(10, 10, Rgb([128, 128, 128]))
        .save(&path)
        .unwrap();
    let images = vec![ImageInfo::from_path(&path)];
    let kb = Arc::new(KnowledgeBase::builtin());

    let offline = FoodDetector::new(kb.clone(), Arc::new(TimeoutOracle), DetectorConfig::default());
    let results = detect_with_cache(&offline, &images, dir.path(), 1, None).await.unwrap();
    assert!(results[0].result.is_empty());
    assert!(results[0].degraded);
    assert!(CacheFile::load(dir.path()).is_empty());

    let online = FoodDetector::new(
        kb,
        Arc::new(StaticOracle::new(vec![LabelCandidate::new("banana", 0.9)])),
        DetectorConfig::default(),
    );
    let results = detect_with_cache(&online, &images, dir.path(), 1, None).await.unwrap();
    assert_eq!(results[0].result.name, "Banana");
    assert_eq!(CacheFile::load(dir.path()).len(), 1);
}

/// 画像として読めないファイルの結果もキャッシュしない
#[tokio::test]
async fn test_detect_with_cache_skips_undecodable_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not an image").unwrap();
    let images = vec![ImageInfo::from_path(&path)];

    let detector = FoodDetector::new(
        Arc::new(KnowledgeBase::builtin()),
        Arc::new(StaticOracle::new(vec![LabelCandidate::new("banana", 0.9)])),
        DetectorConfig::default(),
    );
    let results = detect_with_cache(&detector, &images, dir.path(), 1, None).await.unwrap();
    assert!(results[0].result.is_empty());
    assert!(CacheFile::load(dir.path()).is_empty());
}

/// キャッシュの既定の保存先は画像のフォルダ
#[test]
fn test_default_cache_dir() {
    let dir = tempdir().expect("Failed to create temp dir");
    let image = dir.path().join("a.jpg");
    std::fs::write(&image, b"fake").unwrap();

    assert_eq!(default_cache_dir(&[dir.path().to_path_buf()]), dir.path());
    assert_eq!(default_cache_dir(&[image]), dir.path());
    assert_eq!(default_cache_dir(&[PathBuf::from("a.jpg")]), PathBuf::from("."));
    assert_eq!(default_cache_dir(&[]), PathBuf::from("."));
}
