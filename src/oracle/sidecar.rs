use super::{parse_labels, LabelOracle};
use crate::error::{FoodDetectError, Result};
use async_trait::async_trait;
use food_detect_common::LabelCandidate;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `<画像名>.labels.json` からラベルを読むラベラー
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarOracle;

impl SidecarOracle {
    /// 画像に対応するラベルファイルのパス
    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut name = image.as_os_str().to_owned();
        name.push(".labels.json");
        PathBuf::from(name)
    }
}

#[async_trait]
impl LabelOracle for SidecarOracle {
    fn name(&self) -> &'static str {
        "sidecar"
    }

    async fn labels(&self, image: &Path, _floor: f64) -> Result<Vec<LabelCandidate>> {
        let path = Self::sidecar_path(image);
        if !path.exists() {
            return Err(FoodDetectError::FileNotFound(path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(&path).await?;
        parse_labels(&content)
    }
}

/// 固定のラベル一覧を返すラベラー
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    labels: Vec<LabelCandidate>,
    delay: Option<Duration>,
}

impl StaticOracle {
    pub fn new(labels: Vec<LabelCandidate>) -> Self {
        Self { labels, delay: None }
    }

    /// 応答までの待ち時間を設定
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LabelOracle for StaticOracle {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn labels(&self, _image: &Path, _floor: f64) -> Result<Vec<LabelCandidate>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.labels.clone())
    }
}
