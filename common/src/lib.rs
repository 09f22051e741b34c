//! Food Detect Common Library
//!
//! 食品カタログ・色判定・スコア融合など、I/Oを伴わない共通ロジック

pub mod types;
pub mod error;
pub mod knowledge;
pub mod color;
pub mod fusion;

pub use types::{
    ColorProfile, DetectionResult, DominantColor, FoodCategory, FoodEntry, LabelCandidate,
    MatchResult, MatchType,
};
pub use error::{Error, Result};
pub use knowledge::KnowledgeBase;
pub use color::{classify_rgb, RgbAccumulator};
pub use fusion::{fuse, rank, select, FusionOptions, ScoredCandidate};
