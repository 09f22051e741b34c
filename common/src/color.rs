//! 色プロファイル判定
//!
//! サンプリングしたピクセルの平均RGBから支配色と明るさを決める。
//! ピクセルの取得は呼び出し側（画像デコード側）の責務。

use crate::types::{ColorProfile, DominantColor};

/// 支配色と判定する最小チャンネル平均
const DOMINANT_MIN: f64 = 80.0;
/// 暗色と判定する平均輝度の上限
const DARK_MAX: f64 = 70.0;

/// RGB合計の累積器
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbAccumulator {
    sum_r: u64,
    sum_g: u64,
    sum_b: u64,
    count: u64,
}

impl RgbAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, r: u8, g: u8, b: u8) {
        self.sum_r += r as u64;
        self.sum_g += g as u64;
        self.sum_b += b as u64;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 平均色からプロファイルを求める。サンプル0件ならニュートラル
    pub fn profile(&self) -> ColorProfile {
        if self.count == 0 {
            return ColorProfile::neutral();
        }
        let n = self.count as f64;
        classify_rgb(
            self.sum_r as f64 / n,
            self.sum_g as f64 / n,
            self.sum_b as f64 / n,
        )
    }
}

/// 平均RGB（0-255）から色プロファイルを判定
///
/// 判定は上から順に評価し、最初に一致したものを採用する。
pub fn classify_rgb(r: f64, g: f64, b: f64) -> ColorProfile {
    let dominant = if g > r && g > b && g > DOMINANT_MIN {
        DominantColor::Green
    } else if r > g && r > b && r > DOMINANT_MIN {
        DominantColor::Red
    } else if b > r && b > g && b > DOMINANT_MIN {
        DominantColor::Blue
    } else if r + g > 2.0 * b {
        DominantColor::Yellow
    } else if r + b > 2.0 * g {
        DominantColor::Purple
    } else if (r + g + b) / 3.0 < DARK_MAX {
        DominantColor::Dark
    } else {
        DominantColor::Neutral
    };

    let brightness = ((0.299 * r + 0.587 * g + 0.114 * b) / 255.0).clamp(0.0, 1.0);

    ColorProfile {
        dominant,
        brightness,
    }
}
