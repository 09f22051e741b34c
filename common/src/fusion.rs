//! スコア融合・ランキング
//!
//! ラベル候補・カタログ照合・色プロファイルを1つのスコアに統合し、
//! 最有力候補と代替候補を決める。副作用のない純粋関数。
//!
//! スコアは正規化しない（信頼度 × 照合倍率 × 重み × 色補正）。
//! 閾値はこの値に対して比較する。

use crate::knowledge::KnowledgeBase;
use crate::types::{
    ColorProfile, DetectionResult, DominantColor, FoodCategory, LabelCandidate, MatchType,
};
use serde::Serialize;
use tracing::debug;

/// 最終スコアの下限
pub const DEFAULT_FINAL_FLOOR: f64 = 0.25;
/// 代替候補の最大数
pub const MAX_ALTERNATIVES: usize = 2;

/// 明るさ補正の閾値
const BRIGHTNESS_BOOST_MIN: f64 = 0.6;

/// 食品以外のラベル（食器・家具・身体・背景など）
const STOP_WORDS: &[&str] = &[
    // 食器
    "tableware", "dishware", "serveware", "plate", "bowl", "platter", "saucer", "mug",
    "glass", "cutlery", "fork", "knife", "spoon", "chopsticks", "napkin", "tray",
    "container", "jar", "bottle", "utensil", "cookware", "pan", "pot", "kettle",
    // 家具
    "table", "furniture", "chair", "desk", "countertop", "counter", "shelf", "tablecloth",
    "placemat",
    // 身体
    "hand", "finger", "arm", "person", "face", "skin", "nail", "thumb",
    // 背景・汎用語
    "room", "kitchen", "restaurant", "wall", "floor", "window", "indoor", "outdoor",
    "sky", "wood", "cloth", "textile", "paper", "plastic", "metal", "pattern", "design",
    "art", "font", "logo", "text", "event", "food", "dish", "cuisine", "ingredient",
    "recipe", "meal", "produce", "close-up", "still life", "photography",
];

/// 食品以外の語を部分文字列として含む食品名
const FOOD_WORDS: &[&str] = &[
    "vegetable", "pancake", "panini", "paneer", "panettone", "potato", "hotpot", "mushroom",
    "radish", "oatmeal", "parmesan", "tart", "artichoke", "whisky", "ladyfinger", "seafood",
    "shawarma", "japanese", "spanakopita", "pannacotta", "pandan",
];

/// 色補正ルール（優先順）
const GREEN_CATEGORIES: &[FoodCategory] =
    &[FoodCategory::Vegetable, FoodCategory::Salad, FoodCategory::Fruit];
const RED_CATEGORIES: &[FoodCategory] =
    &[FoodCategory::Fruit, FoodCategory::Meat, FoodCategory::Main];
const YELLOW_CATEGORIES: &[FoodCategory] = &[
    FoodCategory::Fruit,
    FoodCategory::Grain,
    FoodCategory::Dessert,
    FoodCategory::Curry,
    FoodCategory::Snack,
    FoodCategory::Bread,
];
const DARK_CATEGORIES: &[FoodCategory] =
    &[FoodCategory::Dessert, FoodCategory::Beverage, FoodCategory::Meat];
const BRIGHT_CATEGORIES: &[FoodCategory] =
    &[FoodCategory::Fruit, FoodCategory::Dessert, FoodCategory::Salad];

const GREEN_BOOST: f64 = 1.15;
const RED_BOOST: f64 = 1.10;
const YELLOW_BOOST: f64 = 1.10;
const DARK_BOOST: f64 = 1.05;
const BRIGHT_BOOST: f64 = 1.05;

/// 融合オプション
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOptions {
    pub final_floor: f64,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            final_floor: DEFAULT_FINAL_FLOOR,
        }
    }
}

/// ランキング中の候補1件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub label: String,
    pub name: String,
    pub category: FoodCategory,
    pub match_type: MatchType,
    pub color_boost: f64,
    pub score: f64,
}

/// ラベルが食品以外の語を含むか
///
/// 部分一致で判定する（"Teapot" は "pot" を含むので除外）。
/// ただし一致箇所が `FOOD_WORDS` の語の内側に収まる場合は食品とみなす
/// （"vegetables" の "table"、"mushroom" の "room" など）。
pub fn is_stop_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .any(contains_stop_word)
        || STOP_WORDS
            .iter()
            .any(|w| w.contains(' ') && lower.contains(w))
}

fn contains_stop_word(word: &str) -> bool {
    STOP_WORDS.iter().filter(|w| !w.contains(' ')).any(|stop| {
        word.match_indices(stop)
            .any(|(start, _)| !inside_food_word(word, start, start + stop.len()))
    })
}

/// `word[start..end]` が許可リストの食品語の一部か
fn inside_food_word(word: &str, start: usize, end: usize) -> bool {
    FOOD_WORDS.iter().any(|food| {
        word.match_indices(food)
            .any(|(food_start, _)| food_start <= start && end <= food_start + food.len())
    })
}

/// カテゴリと色プロファイルから補正倍率を求める（最初に一致したルールのみ）
pub fn color_boost(category: FoodCategory, profile: &ColorProfile) -> f64 {
    let rules: [(bool, &[FoodCategory], f64); 5] = [
        (profile.dominant == DominantColor::Green, GREEN_CATEGORIES, GREEN_BOOST),
        (profile.dominant == DominantColor::Red, RED_CATEGORIES, RED_BOOST),
        (profile.dominant == DominantColor::Yellow, YELLOW_CATEGORIES, YELLOW_BOOST),
        (profile.dominant == DominantColor::Dark, DARK_CATEGORIES, DARK_BOOST),
        (profile.brightness > BRIGHTNESS_BOOST_MIN, BRIGHT_CATEGORIES, BRIGHT_BOOST),
    ];

    rules
        .iter()
        .find(|(active, categories, _)| *active && categories.contains(&category))
        .map(|(_, _, boost)| *boost)
        .unwrap_or(1.0)
}

/// 各単語の先頭を大文字にする
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// ラベル候補をスコア付けし、閾値以上を降順で返す
pub fn rank(
    labels: &[LabelCandidate],
    profile: &ColorProfile,
    kb: &KnowledgeBase,
    options: &FusionOptions,
) -> Vec<ScoredCandidate> {
    let mut candidates: Vec<ScoredCandidate> = labels
        .iter()
        .filter(|label| {
            let stop = is_stop_label(&label.text);
            if stop {
                debug!(label = %label.text, "食品以外のラベルを除外");
            }
            !stop
        })
        .filter_map(|label| {
            let matched = kb.lookup_best(&label.text)?;
            let boost = color_boost(matched.entry.category, profile);
            let score = label.confidence * matched.score * boost;
            debug!(
                label = %label.text,
                entry = %matched.entry.name,
                match_type = ?matched.match_type,
                boost,
                score,
                "ラベル照合"
            );
            Some(ScoredCandidate {
                label: label.text.clone(),
                name: matched.entry.name.clone(),
                category: matched.entry.category,
                match_type: matched.match_type,
                color_boost: boost,
                score,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.retain(|c| c.score >= options.final_floor);
    candidates
}

/// ランキング済み候補から検出結果を組み立てる
pub fn select(ranked: &[ScoredCandidate]) -> DetectionResult {
    let Some(best) = ranked.first() else {
        return DetectionResult::empty();
    };

    let mut alternatives: Vec<&ScoredCandidate> = Vec::new();

    // 1. 最有力候補と異なるカテゴリから1件ずつ
    for candidate in &ranked[1..] {
        if alternatives.len() >= MAX_ALTERNATIVES {
            break;
        }
        if candidate.category == best.category || candidate.name == best.name {
            continue;
        }
        if alternatives
            .iter()
            .any(|a| a.category == candidate.category || a.name == candidate.name)
        {
            continue;
        }
        alternatives.push(candidate);
    }

    // 2. 足りなければカテゴリを問わず補充
    for candidate in &ranked[1..] {
        if alternatives.len() >= MAX_ALTERNATIVES {
            break;
        }
        if candidate.name == best.name || alternatives.iter().any(|a| a.name == candidate.name) {
            continue;
        }
        alternatives.push(candidate);
    }

    // 補充分を含めてスコア順に並べ直す
    alternatives.sort_by(|a, b| b.score.total_cmp(&a.score));

    DetectionResult {
        name: title_case(&best.name),
        confidence: best.score,
        alternatives: alternatives.iter().map(|a| title_case(&a.name)).collect(),
    }
}

/// ラベル候補と色プロファイルから検出結果を求める
pub fn fuse(
    labels: &[LabelCandidate],
    profile: &ColorProfile,
    kb: &KnowledgeBase,
    options: &FusionOptions,
) -> DetectionResult {
    let ranked = rank(labels, profile, kb, options);
    select(&ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[(&str, f64)]) -> Vec<LabelCandidate> {
        items
            .iter()
            .map(|(text, conf)| LabelCandidate::new(*text, *conf))
            .collect()
    }

    fn fuse_default(items: &[(&str, f64)], profile: ColorProfile) -> DetectionResult {
        fuse(
            &labels(items),
            &profile,
            &KnowledgeBase::builtin(),
            &FusionOptions::default(),
        )
    }

    fn profile(dominant: DominantColor, brightness: f64) -> ColorProfile {
        ColorProfile { dominant, brightness }
    }

    #[test]
    fn test_single_banana_neutral() {
        let result = fuse_default(&[("banana", 0.9)], ColorProfile::neutral());
        assert_eq!(result.name, "Banana");
        assert!((result.confidence - 0.9 * 1.5).abs() < 1e-9);
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_stop_words_only_is_empty() {
        let result = fuse_default(&[("plate", 0.95), ("Table", 0.9)], ColorProfile::neutral());
        assert_eq!(result, DetectionResult::empty());
    }

    #[test]
    fn test_stop_word_substring() {
        assert!(is_stop_label("Dinner Plate"));
        assert!(is_stop_label("kitchen table"));
        assert!(is_stop_label("Close-up"));
        assert!(is_stop_label("Still life photography"));
        // 複合語の食器
        assert!(is_stop_label("Teapot"));
        assert!(is_stop_label("Wineglass"));
        assert!(is_stop_label("Saucepan"));
    }

    #[test]
    fn test_food_words_are_not_stop_labels() {
        assert!(!is_stop_label("vegetable"));
        assert!(!is_stop_label("Leaf vegetables"));
        assert!(!is_stop_label("Cupcake"));
        assert!(!is_stop_label("pancake"));
        assert!(!is_stop_label("Mushroom"));
        assert!(!is_stop_label("Sweet potato"));
        assert!(!is_stop_label("Oatmeal"));
        // 食品語の外側にある食器語は除外される
        assert!(is_stop_label("potato pot"));
    }

    #[test]
    fn test_compound_tableware_not_detected() {
        let result = fuse_default(&[("Teapot", 0.9)], ColorProfile::neutral());
        assert_eq!(result, DetectionResult::empty());

        let result = fuse_default(&[("Wineglass", 0.9), ("grape", 0.7)], ColorProfile::neutral());
        assert_eq!(result.name, "Grape");
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_below_floor_is_empty() {
        // 0.5 * 1.0(keyword) * 0.8(beverage) = 0.4 → 残る
        let result = fuse_default(&[("espresso", 0.5)], ColorProfile::neutral());
        assert_eq!(result.name, "Coffee");

        let options = FusionOptions { final_floor: 0.5 };
        let result = fuse(
            &labels(&[("espresso", 0.5)]),
            &ColorProfile::neutral(),
            &KnowledgeBase::builtin(),
            &options,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_labels_are_empty() {
        let result = fuse_default(&[("xylophone", 0.9)], ColorProfile::neutral());
        assert!(result.is_empty());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_color_boost_priority() {
        let green = profile(DominantColor::Green, 0.9);
        assert_eq!(color_boost(FoodCategory::Vegetable, &green), GREEN_BOOST);
        // 緑ルール対象外 → 明るさルール
        assert_eq!(color_boost(FoodCategory::Dessert, &green), BRIGHT_BOOST);
        // どのルールにも該当しない
        assert_eq!(color_boost(FoodCategory::Soup, &green), 1.0);

        let red = profile(DominantColor::Red, 0.3);
        assert_eq!(color_boost(FoodCategory::Meat, &red), RED_BOOST);
        assert_eq!(color_boost(FoodCategory::Dessert, &red), 1.0);

        let yellow = profile(DominantColor::Yellow, 0.8);
        // 果物は黄色と明るさの両方に該当するが先勝ちで重ならない
        assert_eq!(color_boost(FoodCategory::Fruit, &yellow), YELLOW_BOOST);

        let dark = profile(DominantColor::Dark, 0.1);
        assert_eq!(color_boost(FoodCategory::Beverage, &dark), DARK_BOOST);

        assert_eq!(color_boost(FoodCategory::Fruit, &ColorProfile::neutral()), 1.0);
    }

    #[test]
    fn test_color_boost_applied_to_score() {
        let result = fuse_default(&[("broccoli", 0.8)], profile(DominantColor::Green, 0.4));
        assert_eq!(result.name, "Broccoli");
        assert!((result.confidence - 0.8 * 1.5 * GREEN_BOOST).abs() < 1e-9);
    }

    #[test]
    fn test_alternatives_prefer_distinct_categories() {
        let result = fuse_default(
            &[
                ("banana", 0.9),
                ("apple", 0.85),
                ("bread", 0.8),
                ("yogurt", 0.7),
            ],
            ColorProfile::neutral(),
        );
        assert_eq!(result.name, "Banana");
        // apple は同カテゴリなので後回し
        assert_eq!(result.alternatives, vec!["Bread", "Yogurt"]);
    }

    #[test]
    fn test_alternatives_backfill_same_category() {
        let result = fuse_default(
            &[("banana", 0.9), ("apple", 0.8), ("mango", 0.7)],
            ColorProfile::neutral(),
        );
        assert_eq!(result.name, "Banana");
        assert_eq!(result.alternatives, vec!["Apple", "Mango"]);
    }

    #[test]
    fn test_alternatives_never_repeat_best() {
        let result = fuse_default(
            &[("banana", 0.9), ("Banana", 0.8), ("bananas", 0.7), ("apple", 0.6)],
            ColorProfile::neutral(),
        );
        assert_eq!(result.name, "Banana");
        assert_eq!(result.alternatives, vec!["Apple"]);
    }

    #[test]
    fn test_alternatives_mixed_fill_keeps_score_order() {
        // 異なるカテゴリは bread のみ → apple で補充、スコア順に並ぶ
        let result = fuse_default(
            &[("banana", 0.9), ("apple", 0.85), ("bread", 0.5)],
            ColorProfile::neutral(),
        );
        assert_eq!(result.alternatives, vec!["Apple", "Bread"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("ice cream"), "Ice Cream");
        assert_eq!(title_case("banana"), "Banana");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_fuse_is_idempotent() {
        let input = labels(&[("pizza", 0.7), ("cheese", 0.6), ("tomato", 0.55)]);
        let kb = KnowledgeBase::builtin();
        let p = profile(DominantColor::Red, 0.5);
        let first = fuse(&input, &p, &kb, &FusionOptions::default());
        let second = fuse(&input, &p, &kb, &FusionOptions::default());
        assert_eq!(first, second);
        assert_eq!(first.name, "Pizza");
    }

    #[test]
    fn test_rank_sorted_and_filtered() {
        let ranked = rank(
            &labels(&[("tea", 0.2), ("pizza", 0.7), ("plate", 0.9), ("banana", 0.9)]),
            &ColorProfile::neutral(),
            &KnowledgeBase::builtin(),
            &FusionOptions::default(),
        );
        let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
        // tea: 0.2*1.5*0.8 = 0.24 < 0.25
        assert_eq!(names, vec!["banana", "pizza"]);
    }
}
