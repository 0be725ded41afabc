use std::path::PathBuf;

use clap::Parser;
use log::info;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::codec::FloatFormat;
use crate::config::{Opts, StrategyOptions};
use crate::engine::{Engine, GenerateRequest};

#[derive(Parser, Debug, Clone)]
pub struct GenerateCommand {
    #[command(flatten)]
    pub strategy: StrategyOptions,
    /// 图片所在目录，只处理扩展名为 .jpg 的文件，不递归
    pub path: PathBuf,
    /// 输出的特征文件，默认为配置目录下的 <策略名>.csv
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// 浮点数格式，legacy 与旧版特征文件逐字节一致
    #[arg(long, value_enum, default_value_t = FloatFormat::Shortest)]
    pub float_format: FloatFormat,
    /// 不显示进度条
    #[arg(long)]
    pub no_progress: bool,
}

impl SubCommandExtend for GenerateCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let strategy = self.strategy.strategy();
        let store = match &self.output {
            Some(output) => output.clone(),
            None => {
                opts.conf_dir.ensure()?;
                opts.conf_dir.store(strategy.kind())
            }
        };

        let engine = Engine::new(opts.models()?);
        let request = GenerateRequest {
            directory: self.path.clone(),
            store,
            strategy,
            float_format: self.float_format,
            progress: !self.no_progress,
        };
        let generated = block_in_place(|| engine.generate(&request))?;

        info!("建库完成: {} 张图片，跳过 {} 张", generated.indexed, generated.skipped);
        println!("{}", generated.store.display());
        Ok(())
    }
}
