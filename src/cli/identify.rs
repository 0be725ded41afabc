use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, StrategyOptions};
use crate::engine::{Engine, IdentifyRequest};
use crate::matcher::Match;
use crate::utils::{self, file_name};

#[derive(Parser, Debug, Clone)]
pub struct IdentifyCommand {
    #[command(flatten)]
    pub strategy: StrategyOptions,
    /// 被查询的图片路径
    pub image: PathBuf,
    /// 特征文件，默认为配置目录下的 <策略名>.csv
    #[arg(short = 'f', long, value_name = "FILE")]
    pub store: Option<PathBuf>,
    /// 显示的结果数量
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 3)]
    pub count: usize,
    /// baseline 策略默认丢弃差值为 0 的候选，开启后保留完全相同的图片
    #[arg(long)]
    pub keep_exact_duplicates: bool,
    /// custom-face 策略下，将标注了人脸的匹配图片写入该目录
    #[arg(long, value_name = "DIR")]
    pub annotate_dir: Option<PathBuf>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for IdentifyCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let strategy = self.strategy.strategy();
        let store = self.store.clone().unwrap_or_else(|| opts.conf_dir.store(strategy.kind()));

        let engine = Engine::new(opts.models()?);
        let request = IdentifyRequest {
            query: self.image.clone(),
            store,
            strategy,
            top_n: self.count,
            keep_exact_matches: self.keep_exact_duplicates,
        };
        let result = block_in_place(|| engine.identify(&request))?;

        if let Some(dir) = &self.annotate_dir {
            block_in_place(|| save_annotated(&result, dir))?;
        }
        print_result(&result, self)
    }
}

/// 按排名保存标注后的图片，文件名为 `<排名>_<原文件名>`
fn save_annotated(result: &[Match], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (rank, m) in result.iter().enumerate() {
        if let Some(image) = &m.annotated {
            let path = dir.join(format!("{}_{}", rank + 1, file_name(&m.identifier)));
            utils::imwrite(&path, image)?;
            info!("保存标注图片: {}", path.display());
        }
    }
    Ok(())
}

fn print_result(result: &[Match], opts: &IdentifyCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for m in result {
                println!("{:.4}\t{}", m.score, m.identifier);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
