//! food-detect
//!
//! 画像ラベラーの出力・食品カタログ・色プロファイルを組み合わせて
//! 写真に写った食品を推定する。

pub mod cache;
pub mod cli;
pub mod color;
pub mod config;
pub mod detector;
pub mod error;
pub mod oracle;
pub mod scanner;

pub use detector::{Detection, DetectorConfig, FoodDetector, ImageDetection};
pub use food_detect_common::{
    ColorProfile, DetectionResult, DominantColor, FoodCategory, FoodEntry, KnowledgeBase,
    LabelCandidate,
};
