use crate::error::{FoodDetectError, Result};
use food_detect_common::fusion::DEFAULT_FINAL_FLOOR;
use food_detect_common::KnowledgeBase;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// ラベラーコマンドを上書きする環境変数
pub const ORACLE_ENV: &str = "FOOD_DETECT_ORACLE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ラベラー出力の信頼度下限
    pub label_floor: f64,
    /// 最終スコアの下限
    pub final_floor: f64,
    /// 色サンプリングの間隔（ピクセル）
    pub sample_stride: u32,
    /// 画像ラベラーのコマンド（画像パスは末尾に付与）
    pub oracle_command: Option<String>,
    pub oracle_args: Vec<String>,
    pub oracle_timeout_seconds: u64,
    /// 一括検出の同時実行数
    pub concurrency: usize,
    /// カスタム食品カタログ（JSON）
    pub knowledge_base: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            label_floor: 0.5,
            final_floor: DEFAULT_FINAL_FLOOR,
            sample_stride: 5,
            oracle_command: None,
            oracle_args: Vec::new(),
            oracle_timeout_seconds: 30,
            concurrency: 4,
            knowledge_base: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;

        // 環境変数を優先
        if let Ok(command) = std::env::var(ORACLE_ENV) {
            if !command.trim().is_empty() {
                config.oracle_command = Some(command);
            }
        }

        Ok(config)
    }

    /// 指定パスから読み込み（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FoodDetectError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("food-detect").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.label_floor) {
            return Err(FoodDetectError::Config(format!(
                "label_floor は0.0-1.0で指定してください: {}",
                self.label_floor
            )));
        }
        if self.final_floor < 0.0 {
            return Err(FoodDetectError::Config(format!(
                "final_floor は0以上で指定してください: {}",
                self.final_floor
            )));
        }
        if self.sample_stride == 0 {
            return Err(FoodDetectError::Config("sample_stride は1以上で指定してください".into()));
        }
        if self.concurrency == 0 {
            return Err(FoodDetectError::Config("concurrency は1以上で指定してください".into()));
        }
        Ok(())
    }

    /// 設定に応じた食品カタログを読み込む
    pub fn knowledge_base(&self) -> Result<KnowledgeBase> {
        match &self.knowledge_base {
            Some(path) => {
                if !path.exists() {
                    return Err(FoodDetectError::FileNotFound(path.display().to_string()));
                }
                Ok(KnowledgeBase::from_file(path)?)
            }
            None => Ok(KnowledgeBase::builtin()),
        }
    }
}
