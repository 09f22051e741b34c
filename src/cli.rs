use clap::{Parser, Subcommand};
use crate::oracle::OracleKind;
use food_detect_common::FoodCategory;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "food-detect")]
#[command(about = "食品写真の判定ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// ラベラー (command/sidecar)
    #[arg(long, value_enum, default_value = "command", global = true)]
    pub oracle: OracleKind,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像（またはフォルダ）の食品を判定してJSONを出力
    Detect {
        /// 画像ファイルまたはフォルダのパス
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// キャッシュを使用（再判定をスキップ）
        #[arg(long)]
        use_cache: bool,

        /// キャッシュの保存先（省略時はカレント）
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// 同時実行数（省略時は設定値）
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// スコアの内訳を表示（1枚ずつ）
        #[arg(long)]
        explain: bool,
    },

    /// ラベルを食品カタログで照合
    Lookup {
        /// ラベル文字列
        #[arg(required = true)]
        label: String,

        /// 該当する全エントリをスコア順に表示
        #[arg(short, long)]
        all: bool,
    },

    /// 画像の色プロファイルを表示
    Color {
        /// 画像ファイル
        #[arg(required = true)]
        image: PathBuf,
    },

    /// 食品カタログを一覧表示
    Catalog {
        /// カテゴリで絞り込み
        #[arg(short, long)]
        category: Option<FoodCategory>,
    },

    /// 設定を表示/編集
    Config {
        /// ラベラーコマンドを設定
        #[arg(long)]
        set_oracle: Option<String>,

        /// ラベル信頼度の下限を設定
        #[arg(long)]
        set_label_floor: Option<f64>,

        /// 最終スコアの下限を設定
        #[arg(long)]
        set_final_floor: Option<f64>,

        /// カスタム食品カタログ（JSON）を設定
        #[arg(long)]
        set_knowledge_base: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}
