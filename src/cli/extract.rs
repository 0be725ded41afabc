use std::path::PathBuf;

use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::codec::{FeatureCodec, FeatureRecord, FloatFormat};
use crate::config::{Opts, StrategyOptions};
use crate::dnn::InferenceSession;
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub strategy: StrategyOptions,
    /// 图片路径
    pub image: PathBuf,
    /// 浮点数格式
    #[arg(long, value_enum, default_value_t = FloatFormat::Shortest)]
    pub float_format: FloatFormat,
}

impl SubCommandExtend for ExtractCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let strategy = self.strategy.strategy();
        let models = opts.models()?;

        let record = block_in_place(|| -> anyhow::Result<FeatureRecord> {
            let mut session = InferenceSession::open(&models, strategy.networks())?;
            let image = utils::imread(&self.image)?;
            let vector = strategy.extract(&image, &mut session)?;
            Ok(FeatureRecord::new(self.image.to_string_lossy(), vector))
        })?;

        println!("{}", FeatureCodec::new(self.float_format).encode(&record));
        Ok(())
    }
}
