//! 型定義（CLI/ライブラリ共通）

use serde::{Deserialize, Serialize};
use std::fmt;

/// 食品カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Fruit,
    Vegetable,
    Grain,
    Protein,
    Meat,
    Seafood,
    Dairy,
    Dessert,
    Main,
    Salad,
    Curry,
    Snack,
    Bread,
    Beverage,
    Soup,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 15] = [
        FoodCategory::Fruit,
        FoodCategory::Vegetable,
        FoodCategory::Grain,
        FoodCategory::Protein,
        FoodCategory::Meat,
        FoodCategory::Seafood,
        FoodCategory::Dairy,
        FoodCategory::Dessert,
        FoodCategory::Main,
        FoodCategory::Salad,
        FoodCategory::Curry,
        FoodCategory::Snack,
        FoodCategory::Bread,
        FoodCategory::Beverage,
        FoodCategory::Soup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::Fruit => "fruit",
            FoodCategory::Vegetable => "vegetable",
            FoodCategory::Grain => "grain",
            FoodCategory::Protein => "protein",
            FoodCategory::Meat => "meat",
            FoodCategory::Seafood => "seafood",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Dessert => "dessert",
            FoodCategory::Main => "main",
            FoodCategory::Salad => "salad",
            FoodCategory::Curry => "curry",
            FoodCategory::Snack => "snack",
            FoodCategory::Bread => "bread",
            FoodCategory::Beverage => "beverage",
            FoodCategory::Soup => "soup",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for FoodCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        FoodCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// 食品カタログのエントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    /// 正規名（小文字）
    pub name: String,
    pub category: FoodCategory,
    /// 基本重み
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_weight() -> f64 {
    1.0
}

impl FoodEntry {
    pub fn new(name: &str, category: FoodCategory, weight: f64, keywords: &[&str]) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            category,
            weight,
            keywords: keywords.iter().map(|k| k.trim().to_lowercase()).collect(),
        }
    }
}

/// ラベル候補（画像ラベラーの出力1件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub text: String,
    pub confidence: f64,
}

impl LabelCandidate {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// 支配色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DominantColor {
    Green,
    Red,
    Blue,
    Yellow,
    Purple,
    Dark,
    #[default]
    Neutral,
}

impl fmt::Display for DominantColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DominantColor::Green => "green",
            DominantColor::Red => "red",
            DominantColor::Blue => "blue",
            DominantColor::Yellow => "yellow",
            DominantColor::Purple => "purple",
            DominantColor::Dark => "dark",
            DominantColor::Neutral => "neutral",
        };
        f.pad(s)
    }
}

/// 画像の色プロファイル
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorProfile {
    pub dominant: DominantColor,
    /// 明るさ（0.0-1.0）
    pub brightness: f64,
}

impl ColorProfile {
    pub fn neutral() -> Self {
        Self {
            dominant: DominantColor::Neutral,
            brightness: 0.5,
        }
    }
}

impl Default for ColorProfile {
    fn default() -> Self {
        Self::neutral()
    }
}

/// 照合種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Exact,
    LabelContainsName,
    NameContainsLabel,
    Keyword,
}

impl MatchType {
    /// 重みに掛ける倍率
    pub fn multiplier(&self) -> f64 {
        match self {
            MatchType::Exact => 1.5,
            MatchType::LabelContainsName => 1.2,
            MatchType::NameContainsLabel => 1.1,
            MatchType::Keyword => 1.0,
        }
    }
}

/// ラベルとカタログエントリの照合結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult<'a> {
    pub entry: &'a FoodEntry,
    pub match_type: MatchType,
    pub score: f64,
}

/// 検出結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub name: String,
    pub confidence: f64,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl DetectionResult {
    /// 検出なしを表す空の結果
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// 表示用の信頼度（0.0-1.0に丸める）
    pub fn display_confidence(&self) -> f64 {
        self.confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!("Fruit".parse::<FoodCategory>().unwrap(), FoodCategory::Fruit);
        assert_eq!(" dessert ".parse::<FoodCategory>().unwrap(), FoodCategory::Dessert);
        assert!("furniture".parse::<FoodCategory>().is_err());
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&FoodCategory::Beverage).unwrap();
        assert_eq!(json, "\"beverage\"");
    }

    #[test]
    fn test_food_entry_lowercases() {
        let entry = FoodEntry::new(" Banana ", FoodCategory::Fruit, 1.0, &["Plantain"]);
        assert_eq!(entry.name, "banana");
        assert_eq!(entry.keywords, vec!["plantain"]);
    }

    #[test]
    fn test_food_entry_default_weight() {
        let entry: FoodEntry =
            serde_json::from_str(r#"{"name": "kiwi", "category": "fruit"}"#).unwrap();
        assert_eq!(entry.weight, 1.0);
        assert!(entry.keywords.is_empty());
    }

    #[test]
    fn test_detection_result_empty() {
        let result = DetectionResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_detection_result_camel_case() {
        let result = DetectionResult {
            name: "Banana".into(),
            confidence: 1.35,
            alternatives: vec!["Apple".into()],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"alternatives\""));
        assert_eq!(result.display_confidence(), 1.0);
    }

    #[test]
    fn test_color_profile_default_is_neutral() {
        let profile = ColorProfile::default();
        assert_eq!(profile.dominant, DominantColor::Neutral);
        assert_eq!(profile.brightness, 0.5);
    }
}
