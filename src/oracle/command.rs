//! 外部コマンド版ラベラー
//!
//! `<command> <args...> <画像パス>` を実行し、標準出力のJSON配列を読む。
//! 信頼度下限は環境変数 `FOOD_DETECT_LABEL_FLOOR` で子プロセスに渡す。

use super::{parse_labels, LabelOracle};
use crate::error::{FoodDetectError, Result};
use async_trait::async_trait;
use food_detect_common::LabelCandidate;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl LabelOracle for CommandOracle {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn labels(&self, image: &Path, floor: f64) -> Result<Vec<LabelCandidate>> {
        debug!(program = %self.program, path = %image.display(), "ラベラー実行");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(image)
            .env("FOOD_DETECT_LABEL_FLOOR", floor.to_string())
            // キャンセル・タイムアウト時は子プロセスも終了させる
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| FoodDetectError::OracleTimeout(self.timeout.as_secs()))?
            .map_err(|e| FoodDetectError::Oracle(format!("{} の実行に失敗: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FoodDetectError::Oracle(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_labels(&stdout)
    }
}
