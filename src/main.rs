use anyhow::Context;
use clap::Parser;
use food_detect::{cache, cli, color, config, detector, error, scanner};
use cli::{Cli, Commands};
use config::Config;
use detector::{DetectorConfig, FoodDetector};
use food_detect_common::fusion::title_case;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;

    match cli.command {
        Commands::Detect { paths, output, recursive, use_cache, cache_dir, concurrency, explain } => {
            eprintln!("🍱 food-detect - 食品判定\n");

            // 1. 画像スキャン
            eprintln!("[1/3] 画像をスキャン中...");
            let images = scanner::collect_images(&paths, recursive)?;
            if images.is_empty() {
                let joined = paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(error::FoodDetectError::NoImagesFound(joined).into());
            }
            eprintln!("✔ {}枚の画像を検出\n", images.len());

            // 2. 判定
            let kb = Arc::new(config.knowledge_base()?);
            let oracle = cli.oracle.build(&config)?;
            let detector = FoodDetector::new(kb, oracle, DetectorConfig::from(&config));
            let concurrency = concurrency.unwrap_or(config.concurrency);

            eprintln!("[2/3] 判定中...{}", if use_cache { " (キャッシュ有効)" } else { "" });
            let results = if explain {
                let mut results = Vec::with_capacity(images.len());
                for img in &images {
                    let detection = detector.detect_detailed(&img.path).await;
                    print_explanation(&img.file_name, &detection);
                    results.push(detector::ImageDetection {
                        file_name: img.file_name.clone(),
                        file_path: img.path.display().to_string(),
                        result: detection.result,
                        degraded: detection.degraded,
                    });
                }
                results
            } else {
                let pb = progress_bar(images.len() as u64);
                let results = if use_cache {
                    let dir = cache_dir.unwrap_or_else(|| cache::default_cache_dir(&paths));
                    cache::detect_with_cache(&detector, &images, &dir, concurrency, Some(&pb)).await?
                } else {
                    detector.detect_many(&images, concurrency, Some(&pb)).await
                };
                pb.finish_and_clear();
                results
            };
            let found = results.iter().filter(|r| !r.result.is_empty()).count();
            eprintln!("✔ 判定完了 ({}/{}枚で食品を検出)\n", found, results.len());

            // 3. 出力
            eprintln!("[3/3] 結果を出力中...");
            let json = serde_json::to_string_pretty(&results)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("書き込み失敗: {}", path.display()))?;
                    eprintln!("✔ 結果を保存: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Lookup { label, all } => {
            let kb = config.knowledge_base()?;
            if all {
                let matches = kb.lookup_all(&label);
                if matches.is_empty() {
                    println!("該当なし: {}", label);
                }
                for m in matches {
                    println!(
                        "{:<16} {:<10} {:.3}",
                        title_case(&m.entry.name),
                        m.entry.category,
                        m.score
                    );
                }
            } else {
                match kb.lookup_best(&label) {
                    Some(m) => println!(
                        "{} ({}) {:?} スコア {:.3}",
                        title_case(&m.entry.name),
                        m.entry.category,
                        m.match_type,
                        m.score
                    ),
                    None => println!("該当なし: {}", label),
                }
            }
        }

        Commands::Color { image } => {
            if !image.is_file() {
                return Err(error::FoodDetectError::FileNotFound(image.display().to_string()).into());
            }
            let profile = color::estimate_profile_from_path(&image, config.sample_stride);
            println!("支配色: {}", profile.dominant);
            println!("明るさ: {:.3}", profile.brightness);
        }

        Commands::Catalog { category } => {
            let kb = config.knowledge_base()?;
            let entries = kb
                .entries()
                .iter()
                .filter(|e| category.map_or(true, |c| e.category == c));
            for entry in entries {
                println!(
                    "{:<16} {:<10} {:.2}  {}",
                    title_case(&entry.name),
                    entry.category,
                    entry.weight,
                    entry.keywords.join(", ")
                );
            }
        }

        Commands::Config { set_oracle, set_label_floor, set_final_floor, set_knowledge_base, show } => {
            let mut config = config;
            let mut changed = false;

            if let Some(command) = set_oracle {
                config.oracle_command = Some(command);
                changed = true;
            }
            if let Some(floor) = set_label_floor {
                config.label_floor = floor;
                changed = true;
            }
            if let Some(floor) = set_final_floor {
                config.final_floor = floor;
                changed = true;
            }
            if let Some(path) = set_knowledge_base {
                config.knowledge_base = Some(path);
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  ラベラー: {}", config.oracle_command.as_deref().unwrap_or("未設定"));
                println!("  ラベラー引数: {:?}", config.oracle_args);
                println!("  タイムアウト: {}秒", config.oracle_timeout_seconds);
                println!("  ラベル信頼度下限: {}", config.label_floor);
                println!("  最終スコア下限: {}", config.final_floor);
                println!("  サンプリング間隔: {}px", config.sample_stride);
                println!("  同時実行数: {}", config.concurrency);
                println!(
                    "  食品カタログ: {}",
                    config
                        .knowledge_base
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "組み込み".into())
                );
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = cache::CacheFile::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = cache::CacheFile::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match cache::CacheFile::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("  {bar:40} {pos}/{len} {elapsed}") {
        pb.set_style(style);
    }
    pb
}

fn print_explanation(file_name: &str, detection: &detector::Detection) {
    eprintln!("  {}", file_name);
    eprintln!(
        "    色: {} / 明るさ {:.2}",
        detection.profile.dominant, detection.profile.brightness
    );
    for label in &detection.labels {
        eprintln!("    ラベル: {} ({:.2})", label.text, label.confidence);
    }
    for c in &detection.ranked {
        eprintln!(
            "    候補: {} <- {} [{:?}] 色補正 x{:.2} = {:.3}",
            title_case(&c.name),
            c.label,
            c.match_type,
            c.color_boost,
            c.score
        );
    }
    if detection.result.is_empty() {
        eprintln!("    → 該当なし");
    } else {
        eprintln!(
            "    → {} ({:.2}) 代替: {:?}",
            detection.result.name,
            detection.result.display_confidence(),
            detection.result.alternatives
        );
    }
}
