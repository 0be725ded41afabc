use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::dnn::ModelPaths;
use crate::features::ColorSpace;
use crate::strategy::{Strategy, StrategyKind};

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "cbir", "cbir").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct StrategyOptions {
    /// 检索策略
    #[arg(short, long, value_enum, default_value_t = StrategyKind::Baseline)]
    pub strategy: StrategyKind,
    /// 颜色直方图每个通道的桶数
    #[arg(
        short,
        long,
        value_name = "N",
        default_value_t = 8,
        value_parser = clap::value_parser!(u32).range(1..=256)
    )]
    pub bins: u32,
    /// 纹理直方图的桶数
    #[arg(
        long,
        value_name = "N",
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub texture_bins: u32,
    /// histogram 策略使用的颜色空间
    #[arg(long, value_enum, default_value_t = ColorSpace::Bgr)]
    pub color_space: ColorSpace,
    /// custom 策略使用分段加权距离代替整体欧氏距离
    #[arg(long)]
    pub weighted: bool,
}

impl StrategyOptions {
    pub fn strategy(&self) -> Strategy {
        let bins = self.bins as usize;
        match self.strategy {
            StrategyKind::Baseline => Strategy::Baseline,
            StrategyKind::Histogram => Strategy::Histogram { bins, color_space: self.color_space },
            StrategyKind::MultiHistogram => Strategy::MultiHistogram { bins },
            StrategyKind::TextureColor => Strategy::TextureColor {
                color_bins: bins,
                texture_bins: self.texture_bins as usize,
            },
            StrategyKind::DeepEmbedding => Strategy::DeepEmbedding,
            StrategyKind::Custom => Strategy::Custom { weighted: self.weighted },
            StrategyKind::CustomFace => Strategy::CustomFace,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "cbir", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 特征文件的默认存放目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 模型文件目录，默认为可执行文件所在目录下的 models
    #[arg(short, long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,
}

impl Opts {
    pub fn models(&self) -> crate::Result<ModelPaths> {
        match &self.model_dir {
            Some(dir) => Ok(ModelPaths::new(dir)),
            None => ModelPaths::beside_executable(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 为目录中的 jpg 图片生成特征文件
    Generate(GenerateCommand),
    /// 在特征文件中查找与图片最相似的记录
    Identify(IdentifyCommand),
    /// 输出单张图片的特征向量
    Extract(ExtractCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回策略对应的默认特征文件路径
    pub fn store(&self, kind: StrategyKind) -> PathBuf {
        self.path.join(format!("{}.csv", kind))
    }

    /// 确保目录存在
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
