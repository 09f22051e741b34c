use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoodDetectError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("ラベラー呼び出しエラー: {0}")]
    Oracle(String),

    #[error("ラベラー出力のパースに失敗: {0}")]
    OracleParse(String),

    #[error("ラベラーがタイムアウトしました ({0}秒)")]
    OracleTimeout(u64),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error(transparent)]
    Common(#[from] food_detect_common::Error),
}

pub type Result<T> = std::result::Result<T, FoodDetectError>;
