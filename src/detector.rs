//! 食品検出モジュール
//!
//! 1枚の画像に対して、ラベラー呼び出しと色サンプリングを並行実行し、
//! 両方の完了を待ってからスコア融合する。
//!
//! - ラベラー: 非同期I/O（`LabelOracle`）
//! - 色サンプリング: ブロッキングプール（`spawn_blocking`）
//!
//! どの段階で失敗しても呼び出し側にはエラーを返さず、
//! 空の検出結果またはニュートラルな色プロファイルに落とす。

use crate::color::estimate_profile;
use crate::config::Config;
use crate::error::FoodDetectError;
use crate::oracle::{fetch_labels, LabelOracle};
use crate::scanner::ImageInfo;
use food_detect_common::{
    fusion, ColorProfile, DetectionResult, FusionOptions, KnowledgeBase, LabelCandidate,
    ScoredCandidate,
};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 検出の調整値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub label_floor: f64,
    pub sample_stride: u32,
    pub fusion: FusionOptions,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::from(&Config::default())
    }
}

impl From<&Config> for DetectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            label_floor: config.label_floor,
            sample_stride: config.sample_stride,
            fusion: FusionOptions {
                final_floor: config.final_floor,
            },
        }
    }
}

/// 検出の中間結果を含む詳細
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub result: DetectionResult,
    pub labels: Vec<LabelCandidate>,
    pub profile: ColorProfile,
    pub ranked: Vec<ScoredCandidate>,
    /// ラベラー失敗または画像デコード失敗で結果が欠けている
    pub degraded: bool,
}

/// 画像1枚分の検出結果（一括検出・キャッシュ用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetection {
    pub file_name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(flatten)]
    pub result: DetectionResult,
    /// キャッシュしてはいけない結果（出力JSONには含めない）
    #[serde(skip)]
    pub degraded: bool,
}

#[derive(Clone)]
pub struct FoodDetector {
    kb: Arc<KnowledgeBase>,
    oracle: Arc<dyn LabelOracle>,
    config: DetectorConfig,
}

impl FoodDetector {
    pub fn new(kb: Arc<KnowledgeBase>, oracle: Arc<dyn LabelOracle>, config: DetectorConfig) -> Self {
        Self { kb, oracle, config }
    }

    /// 画像から食品を検出する
    pub async fn detect(&self, path: &Path) -> DetectionResult {
        self.detect_detailed(path).await.result
    }

    /// 中間結果付きで検出する
    pub async fn detect_detailed(&self, path: &Path) -> Detection {
        if !path.is_file() {
            warn!(path = %path.display(), "画像が見つかりません");
            return Detection {
                degraded: true,
                ..Default::default()
            };
        }

        let image_path = path.to_path_buf();
        let stride = self.config.sample_stride;
        let color_task = tokio::task::spawn_blocking(move || {
            let image = image::open(&image_path)
                .map_err(|e| FoodDetectError::ImageLoad(format!("{}: {}", image_path.display(), e)))?;
            Ok::<_, FoodDetectError>(estimate_profile(&image, stride))
        });
        let labels_task = fetch_labels(self.oracle.as_ref(), path, self.config.label_floor);

        let (fetched, color) = tokio::join!(labels_task, color_task);
        let labels = fetched.labels;

        let profile = match color {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                // 画像自体が読めない場合は検出なし
                warn!(error = %e, "画像デコード失敗");
                return Detection {
                    labels,
                    degraded: true,
                    ..Default::default()
                };
            }
            Err(e) => {
                warn!(error = %e, "色サンプリング失敗、ニュートラルを使用");
                ColorProfile::neutral()
            }
        };

        let ranked = fusion::rank(&labels, &profile, &self.kb, &self.config.fusion);
        let result = fusion::select(&ranked);
        debug!(
            path = %path.display(),
            name = %result.name,
            confidence = result.confidence,
            dominant = %profile.dominant,
            "検出完了"
        );

        Detection {
            result,
            labels,
            profile,
            ranked,
            degraded: fetched.failed,
        }
    }

    /// キャンセル可能な検出。キャンセルされた場合は `None`
    pub async fn detect_with_cancel(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Option<DetectionResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path = %path.display(), "検出をキャンセル");
                None
            }
            result = self.detect(path) => Some(result),
        }
    }

    /// 複数画像を並行検出する（結果は入力順）
    pub async fn detect_many(
        &self,
        images: &[ImageInfo],
        concurrency: usize,
        progress: Option<&ProgressBar>,
    ) -> Vec<ImageDetection> {
        stream::iter(images)
            .map(|img| async move {
                let detection = self.detect_detailed(&img.path).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                ImageDetection {
                    file_name: img.file_name.clone(),
                    file_path: img.path.display().to_string(),
                    result: detection.result,
                    degraded: detection.degraded,
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
