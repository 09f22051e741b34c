//! 画像ラベラー連携モジュール
//!
//! 画像ラベラーは外部の依存として扱い、(ラベル, 信頼度) の一覧だけを受け取る。
//! - `CommandOracle`: 外部コマンドを実行し、標準出力のJSONを読む
//! - `SidecarOracle`: 画像の隣にある `<画像名>.labels.json` を読む
//! - `StaticOracle`: 固定のラベル一覧を返す
//!
//! 失敗は `fetch_labels` でラベル0件に落とし、検出処理は止めない。

mod command;
mod sidecar;

pub use command::CommandOracle;
pub use sidecar::{SidecarOracle, StaticOracle};

use crate::config::Config;
use crate::error::{FoodDetectError, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use food_detect_common::LabelCandidate;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// ラベラーの種類
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OracleKind {
    /// 外部コマンド（設定 `oracle_command`）
    Command,
    /// `<画像名>.labels.json`
    Sidecar,
}

impl OracleKind {
    /// 設定からラベラーを組み立てる
    pub fn build(&self, config: &Config) -> Result<Arc<dyn LabelOracle>> {
        match self {
            OracleKind::Command => {
                let program = config.oracle_command.clone().ok_or_else(|| {
                    FoodDetectError::Config(format!(
                        "ラベラーコマンドが設定されていません。`food-detect config --set-oracle CMD` または環境変数 {} で設定してください",
                        crate::config::ORACLE_ENV
                    ))
                })?;
                Ok(Arc::new(CommandOracle::new(
                    program,
                    config.oracle_args.clone(),
                    Duration::from_secs(config.oracle_timeout_seconds),
                )))
            }
            OracleKind::Sidecar => Ok(Arc::new(SidecarOracle)),
        }
    }
}

#[async_trait]
pub trait LabelOracle: Send + Sync {
    fn name(&self) -> &'static str;

    /// 画像のラベル候補を取得する（`floor` 未満は返さなくてよい）
    async fn labels(&self, image: &Path, floor: f64) -> Result<Vec<LabelCandidate>>;
}

/// ラベル取得の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedLabels {
    pub labels: Vec<LabelCandidate>,
    /// ラベラーがエラーを返した（`labels` は空）
    pub failed: bool,
}

/// ラベルを取得し、失敗時は空を返す
///
/// 信頼度は0.0-1.0に丸め、`floor` 未満と空文字のラベルは除外する。
pub async fn fetch_labels(oracle: &dyn LabelOracle, image: &Path, floor: f64) -> FetchedLabels {
    match oracle.labels(image, floor).await {
        Ok(labels) => {
            let labels: Vec<LabelCandidate> = labels
                .into_iter()
                .map(|l| LabelCandidate::new(l.text.trim(), l.confidence.clamp(0.0, 1.0)))
                .filter(|l| !l.text.is_empty() && l.confidence >= floor)
                .collect();
            debug!(oracle = oracle.name(), count = labels.len(), "ラベル取得");
            FetchedLabels {
                labels,
                failed: false,
            }
        }
        Err(e) => {
            warn!(
                oracle = oracle.name(),
                path = %image.display(),
                error = %e,
                "ラベル取得失敗、ラベルなしで続行"
            );
            FetchedLabels {
                labels: Vec::new(),
                failed: true,
            }
        }
    }
}

/// ラベラー出力の1要素（フィールド名の揺れを吸収）
#[derive(Debug, Deserialize)]
struct RawLabel {
    #[serde(alias = "label", alias = "description", alias = "name")]
    text: String,
    #[serde(alias = "score", alias = "probability")]
    confidence: f64,
}

/// ラベラー出力からJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の [...] 配列
fn extract_json(output: &str) -> Result<&str> {
    if let Some(start_marker) = output.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = output[start..].find("```") {
            return Ok(output[start..start + end_offset].trim());
        }
    }

    if let (Some(start), Some(end)) = (output.find('['), output.rfind(']')) {
        if end >= start {
            return Ok(&output[start..=end]);
        }
    }

    Err(FoodDetectError::OracleParse("JSON配列が見つかりません".into()))
}

/// ラベラー出力をパース
pub fn parse_labels(output: &str) -> Result<Vec<LabelCandidate>> {
    let json = extract_json(output)?;
    let raw: Vec<RawLabel> = serde_json::from_str(json)
        .map_err(|e| FoodDetectError::OracleParse(format!("{}", e)))?;
    Ok(raw
        .into_iter()
        .map(|r| LabelCandidate::new(r.text, r.confidence))
        .collect())
}
