//! 画像の色プロファイル推定
//!
//! 全ピクセルではなく一定間隔でサンプリングして計算量を抑える。
//! 失敗時はニュートラルなプロファイルを返し、呼び出し側を止めない。

use food_detect_common::{ColorProfile, RgbAccumulator};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use tracing::warn;

pub const DEFAULT_STRIDE: u32 = 5;

/// デコード済み画像から色プロファイルを推定
pub fn estimate_profile(image: &DynamicImage, stride: u32) -> ColorProfile {
    let stride = stride.max(1) as usize;
    let (width, height) = image.dimensions();
    let mut acc = RgbAccumulator::new();

    for y in (0..height).step_by(stride) {
        for x in (0..width).step_by(stride) {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            acc.push(r, g, b);
        }
    }

    acc.profile()
}

/// 画像ファイルを読み込んで色プロファイルを推定
pub fn estimate_profile_from_path(path: &Path, stride: u32) -> ColorProfile {
    match image::open(path) {
        Ok(image) => estimate_profile(&image, stride),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "色サンプリング失敗、ニュートラルを使用");
            ColorProfile::neutral()
        }
    }
}
