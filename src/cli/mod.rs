mod extract;
mod generate;
mod identify;

pub use extract::*;
pub use generate::*;
pub use identify::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
