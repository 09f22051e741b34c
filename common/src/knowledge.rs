//! 食品カタログ（ナレッジベース）
//!
//! ラベル文字列を正規の食品エントリに対応付ける。
//! 構築後は読み取り専用で、複数の検出リクエストから `Arc` 経由で共有する。

use crate::error::{Error, Result};
use crate::types::{FoodCategory, FoodEntry, MatchResult, MatchType};

/// lookup_all の加点
const SCORE_NAME_EXACT: f64 = 1.0;
const SCORE_LABEL_CONTAINS_NAME: f64 = 0.8;
const SCORE_NAME_CONTAINS_LABEL: f64 = 0.6;
const SCORE_KEYWORD_EXACT: f64 = 0.5;
const SCORE_LABEL_CONTAINS_KEYWORD: f64 = 0.3;
const SCORE_KEYWORD_CONTAINS_LABEL: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<FoodEntry>,
}

impl KnowledgeBase {
    /// エントリ一覧から構築（名前・キーワードは小文字化）
    pub fn new(entries: Vec<FoodEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| FoodEntry {
                name: normalize(&e.name),
                category: e.category,
                weight: e.weight,
                keywords: e
                    .keywords
                    .iter()
                    .map(|k| normalize(k))
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .filter(|e| !e.name.is_empty())
            .collect();

        Self { entries }
    }

    /// 組み込みカタログ
    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    /// JSON配列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<FoodEntry> = serde_json::from_str(json)?;
        let kb = Self::new(entries);
        if kb.is_empty() {
            return Err(Error::Config("食品カタログが空です".into()));
        }
        Ok(kb)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn entries(&self) -> &[FoodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 正規名でエントリを取得
    pub fn get(&self, name: &str) -> Option<&FoodEntry> {
        let name = normalize(name);
        self.entries.iter().find(|e| e.name == name)
    }

    /// ラベルに最も合うエントリを1件返す
    ///
    /// 優先順位:
    /// 1. 名前の完全一致（1.5倍）
    /// 2. ラベルが名前を含む（1.2倍）
    /// 3. 名前がラベルを含む（1.1倍）
    /// 4. キーワード一致（1.0倍、重み最大のもの）
    ///
    /// 2と3で複数該当した場合は名前の長いもの、次に重みの大きいものを採用する。
    pub fn lookup_best(&self, label: &str) -> Option<MatchResult<'_>> {
        let label = normalize(label);
        if label.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.iter().find(|e| e.name == label) {
            return Some(matched(entry, MatchType::Exact));
        }

        let contains_name = self
            .entries
            .iter()
            .filter(|e| label.contains(e.name.as_str()));
        if let Some(entry) = most_specific(contains_name) {
            return Some(matched(entry, MatchType::LabelContainsName));
        }

        let contained_in_name = self
            .entries
            .iter()
            .filter(|e| e.name.contains(label.as_str()));
        if let Some(entry) = most_specific(contained_in_name) {
            return Some(matched(entry, MatchType::NameContainsLabel));
        }

        let keyword_hits = self.entries.iter().filter(|e| {
            e.keywords.iter().any(|k| {
                k == &label || label.contains(k.as_str()) || k.contains(label.as_str())
            })
        });
        let best = keyword_hits.fold(None::<&FoodEntry>, |best, e| match best {
            Some(b) if b.weight >= e.weight => Some(b),
            _ => Some(e),
        });

        best.map(|entry| matched(entry, MatchType::Keyword))
    }

    /// ラベルに該当する全エントリをスコア降順で返す
    pub fn lookup_all(&self, label: &str) -> Vec<MatchResult<'_>> {
        let label = normalize(label);
        if label.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<MatchResult<'_>> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let (name_score, match_type) = if entry.name == label {
                    (SCORE_NAME_EXACT, Some(MatchType::Exact))
                } else if label.contains(entry.name.as_str()) {
                    (SCORE_LABEL_CONTAINS_NAME, Some(MatchType::LabelContainsName))
                } else if entry.name.contains(label.as_str()) {
                    (SCORE_NAME_CONTAINS_LABEL, Some(MatchType::NameContainsLabel))
                } else {
                    (0.0, None)
                };

                let keyword_score: f64 = entry
                    .keywords
                    .iter()
                    .map(|k| {
                        if k == &label {
                            SCORE_KEYWORD_EXACT
                        } else if label.contains(k.as_str()) {
                            SCORE_LABEL_CONTAINS_KEYWORD
                        } else if k.contains(label.as_str()) {
                            SCORE_KEYWORD_CONTAINS_LABEL
                        } else {
                            0.0
                        }
                    })
                    .sum();

                let score = (name_score + keyword_score) * entry.weight;
                if score > 0.0 {
                    Some(MatchResult {
                        entry,
                        match_type: match_type.unwrap_or(MatchType::Keyword),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        // sort_by は安定ソートなのでカタログ順が保たれる
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn matched(entry: &FoodEntry, match_type: MatchType) -> MatchResult<'_> {
    MatchResult {
        entry,
        match_type,
        score: match_type.multiplier() * entry.weight,
    }
}

/// 名前の長さ → 重み → カタログ順で最も具体的なエントリを選ぶ
fn most_specific<'a>(candidates: impl Iterator<Item = &'a FoodEntry>) -> Option<&'a FoodEntry> {
    candidates.fold(None, |best: Option<&FoodEntry>, e| match best {
        Some(b)
            if b.name.len() > e.name.len()
                || (b.name.len() == e.name.len() && b.weight >= e.weight) =>
        {
            Some(b)
        }
        _ => Some(e),
    })
}

fn builtin_entries() -> Vec<FoodEntry> {
    use FoodCategory::*;

    vec![
        // 果物
        FoodEntry::new("apple", Fruit, 1.0, &["fuji", "gala", "granny smith", "mcintosh"]),
        FoodEntry::new("banana", Fruit, 1.0, &["plantain"]),
        FoodEntry::new("orange", Fruit, 1.0, &["mandarin", "tangerine", "clementine", "citrus"]),
        FoodEntry::new("strawberry", Fruit, 1.0, &["berry"]),
        FoodEntry::new("blueberry", Fruit, 1.0, &["bilberry"]),
        FoodEntry::new("grape", Fruit, 1.0, &["raisin", "vineyard"]),
        FoodEntry::new("watermelon", Fruit, 1.0, &["melon"]),
        FoodEntry::new("pineapple", Fruit, 1.0, &["ananas"]),
        FoodEntry::new("mango", Fruit, 1.0, &[]),
        FoodEntry::new("pear", Fruit, 1.0, &[]),
        FoodEntry::new("peach", Fruit, 1.0, &["nectarine", "apricot"]),
        FoodEntry::new("cherry", Fruit, 1.0, &[]),
        FoodEntry::new("lemon", Fruit, 1.0, &["lime"]),
        FoodEntry::new("kiwi", Fruit, 1.0, &[]),
        FoodEntry::new("avocado", Fruit, 1.0, &["guacamole"]),
        // 野菜
        FoodEntry::new("broccoli", Vegetable, 1.0, &["floret", "cauliflower"]),
        FoodEntry::new("carrot", Vegetable, 1.0, &[]),
        FoodEntry::new("tomato", Vegetable, 1.0, &["cherry tomato"]),
        FoodEntry::new("potato", Vegetable, 1.0, &["spud", "tater"]),
        FoodEntry::new("lettuce", Vegetable, 1.0, &["romaine", "iceberg"]),
        FoodEntry::new("spinach", Vegetable, 1.0, &["kale", "leafy green", "chard"]),
        FoodEntry::new("cucumber", Vegetable, 1.0, &["pickle", "zucchini"]),
        FoodEntry::new("onion", Vegetable, 1.0, &["shallot", "scallion", "leek"]),
        FoodEntry::new("corn", Vegetable, 1.0, &["maize", "sweetcorn", "cob"]),
        FoodEntry::new("bell pepper", Vegetable, 1.0, &["capsicum", "paprika"]),
        FoodEntry::new("eggplant", Vegetable, 1.0, &["aubergine"]),
        FoodEntry::new("mushroom", Vegetable, 0.9, &["fungus", "shiitake", "champignon"]),
        FoodEntry::new("pumpkin", Vegetable, 1.0, &["squash", "gourd"]),
        FoodEntry::new("green beans", Vegetable, 1.0, &["string bean", "snap pea"]),
        FoodEntry::new("cabbage", Vegetable, 1.0, &["sauerkraut", "bok choy"]),
        // 穀物
        FoodEntry::new("rice", Grain, 1.0, &["basmati", "jasmine rice", "risotto"]),
        FoodEntry::new("pasta", Grain, 1.0, &["spaghetti", "penne", "macaroni", "fettuccine"]),
        FoodEntry::new("noodles", Grain, 1.0, &["ramen", "udon", "soba", "lo mein"]),
        FoodEntry::new("oatmeal", Grain, 1.0, &["porridge", "oats"]),
        FoodEntry::new("cereal", Grain, 0.9, &["granola", "muesli", "cornflakes"]),
        FoodEntry::new("quinoa", Grain, 1.0, &["couscous", "bulgur"]),
        // たんぱく質
        FoodEntry::new("egg", Protein, 1.0, &["omelette", "omelet", "yolk", "scrambled"]),
        FoodEntry::new("tofu", Protein, 1.0, &["bean curd", "tempeh"]),
        FoodEntry::new("beans", Protein, 0.9, &["legume", "lentil", "chickpea", "hummus"]),
        // 肉
        FoodEntry::new("chicken", Meat, 1.0, &["poultry", "drumstick", "chicken wing", "nugget"]),
        FoodEntry::new("beef", Meat, 1.0, &["brisket", "roast beef", "ground beef"]),
        FoodEntry::new("steak", Meat, 1.0, &["sirloin", "ribeye", "t-bone"]),
        FoodEntry::new("pork", Meat, 1.0, &["bacon", "ham", "sausage", "pork chop"]),
        FoodEntry::new("lamb", Meat, 1.0, &["mutton", "kebab"]),
        // 魚介
        FoodEntry::new("fish", Seafood, 1.0, &["salmon", "tuna", "cod", "fillet", "trout"]),
        FoodEntry::new("shrimp", Seafood, 1.0, &["prawn", "scampi"]),
        FoodEntry::new("crab", Seafood, 1.0, &["lobster", "crawfish"]),
        FoodEntry::new("sushi", Seafood, 1.1, &["sashimi", "maki", "nigiri"]),
        // 乳製品
        FoodEntry::new("cheese", Dairy, 0.9, &["cheddar", "mozzarella", "parmesan", "brie"]),
        FoodEntry::new("milk", Dairy, 0.9, &["dairy", "cream"]),
        FoodEntry::new("yogurt", Dairy, 1.0, &["yoghurt", "kefir", "parfait"]),
        FoodEntry::new("butter", Dairy, 0.8, &["margarine", "ghee"]),
        // デザート
        FoodEntry::new("cake", Dessert, 1.0, &["birthday cake", "sponge", "frosting", "icing"]),
        FoodEntry::new("cheesecake", Dessert, 1.0, &[]),
        FoodEntry::new("cupcake", Dessert, 1.0, &["muffin"]),
        FoodEntry::new("ice cream", Dessert, 1.0, &["gelato", "sorbet", "sundae", "popsicle"]),
        FoodEntry::new("cookie", Dessert, 1.0, &["biscuit", "macaron"]),
        FoodEntry::new("donut", Dessert, 1.0, &["doughnut"]),
        FoodEntry::new("chocolate", Dessert, 0.9, &["cocoa", "truffle", "fudge"]),
        FoodEntry::new("pie", Dessert, 0.9, &["tart", "cobbler"]),
        FoodEntry::new("apple pie", Dessert, 1.0, &[]),
        FoodEntry::new("pudding", Dessert, 1.0, &["custard", "flan", "mousse"]),
        FoodEntry::new("brownie", Dessert, 1.0, &[]),
        // 主菜
        FoodEntry::new("pizza", Main, 1.1, &["margherita", "pepperoni", "calzone"]),
        FoodEntry::new("burger", Main, 1.1, &["hamburger", "cheeseburger", "patty"]),
        FoodEntry::new("sandwich", Main, 1.0, &["panini", "wrap", "club sandwich"]),
        FoodEntry::new("lasagna", Main, 1.0, &["lasagne"]),
        FoodEntry::new("taco", Main, 1.0, &["burrito", "quesadilla", "enchilada", "nachos"]),
        FoodEntry::new("fried rice", Main, 1.0, &["nasi goreng", "pilaf"]),
        FoodEntry::new("stir fry", Main, 1.0, &["wok", "chow mein"]),
        FoodEntry::new("hot dog", Main, 1.0, &["frankfurter", "wiener"]),
        FoodEntry::new("dumpling", Main, 1.0, &["gyoza", "dim sum", "wonton", "pierogi"]),
        FoodEntry::new("casserole", Main, 0.9, &["gratin", "hotpot"]),
        // サラダ
        FoodEntry::new("salad", Salad, 1.0, &["greens", "caesar", "coleslaw"]),
        FoodEntry::new("fruit salad", Salad, 1.0, &[]),
        // カレー
        FoodEntry::new("curry", Curry, 1.0, &["masala", "tikka", "korma", "vindaloo"]),
        // スナック
        FoodEntry::new("chips", Snack, 0.9, &["crisps", "tortilla chip"]),
        FoodEntry::new("french fries", Snack, 1.0, &["fries", "wedges"]),
        FoodEntry::new("popcorn", Snack, 1.0, &[]),
        FoodEntry::new("pretzel", Snack, 1.0, &[]),
        FoodEntry::new("cracker", Snack, 0.9, &["rice cake", "saltine"]),
        FoodEntry::new("mixed nuts", Snack, 0.9, &["nut", "almond", "peanut", "cashew", "walnut"]),
        // パン
        FoodEntry::new("bread", Bread, 1.0, &["loaf", "toast", "baguette", "sourdough"]),
        FoodEntry::new("bagel", Bread, 1.0, &[]),
        FoodEntry::new("croissant", Bread, 1.0, &["pastry", "danish"]),
        FoodEntry::new("pancake", Bread, 1.0, &["crepe", "waffle"]),
        FoodEntry::new("tortilla", Bread, 0.9, &["flatbread", "naan", "pita"]),
        // 飲料
        FoodEntry::new("coffee", Beverage, 0.8, &["espresso", "latte", "cappuccino"]),
        FoodEntry::new("tea", Beverage, 0.8, &["matcha", "chai"]),
        FoodEntry::new("juice", Beverage, 0.8, &["smoothie", "lemonade"]),
        FoodEntry::new("soda", Beverage, 0.8, &["cola", "soft drink"]),
        FoodEntry::new("wine", Beverage, 0.8, &[]),
        FoodEntry::new("beer", Beverage, 0.8, &["lager", "stout"]),
        // スープ
        FoodEntry::new("soup", Soup, 1.0, &["broth", "stew", "chowder", "bisque", "miso"]),
    ]
}
