use log::debug;
use serde::Serialize;

use crate::codec::FeatureRecord;
use crate::distance::Order;
use crate::error::Result;
use crate::image::Image;
use crate::strategy::Strategy;
use crate::utils::file_name;

/// 一条匹配结果
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub identifier: String,
    pub score: f32,
    /// 标注了人脸的匹配图片
    #[serde(skip)]
    pub annotated: Option<Image>,
}

impl Match {
    pub fn new(identifier: impl Into<String>, score: f32) -> Self {
        Self { identifier: identifier.into(), score, annotated: None }
    }
}

/// 按相似程度从高到低排列的匹配结果
pub type MatchSet = Vec<Match>;

/// 线性扫描特征库，返回与查询最相似的前 N 条记录
#[derive(Debug, Clone)]
pub struct Matcher {
    strategy: Strategy,
    top_n: usize,
    drop_exact: bool,
}

impl Matcher {
    pub fn new(strategy: Strategy, top_n: usize) -> Self {
        Self { strategy, top_n, drop_exact: strategy.drops_exact_matches() }
    }

    /// 保留得分恰好为 0 的候选
    pub fn keep_exact_matches(mut self, keep: bool) -> Self {
        self.drop_exact = self.strategy.drops_exact_matches() && !keep;
        self
    }

    /// 对特征库排序
    ///
    /// 文件名与查询图片相同的记录会被排除，相同得分保持特征库中的原始顺序。
    pub fn rank(
        &self,
        query_path: &str,
        query: &[f32],
        store: &[FeatureRecord],
    ) -> Result<MatchSet> {
        let query_name = file_name(query_path);

        let mut matches = vec![];
        for record in store {
            if file_name(&record.identifier) == query_name {
                continue;
            }
            if self.strategy.has_variable_length() && record.vector.len() != query.len() {
                debug!(
                    "跳过维度不同的记录 {}: {} != {}",
                    record.identifier,
                    record.vector.len(),
                    query.len()
                );
                continue;
            }

            let score = self.strategy.score(query, &record.vector)?;
            if self.drop_exact && score == 0. {
                debug!("跳过完全相同的记录: {}", record.identifier);
                continue;
            }
            matches.push(Match::new(record.identifier.as_str(), score));
        }

        match self.strategy.order() {
            Order::Ascending => matches.sort_by(|a, b| a.score.total_cmp(&b.score)),
            Order::Descending => matches.sort_by(|a, b| b.score.total_cmp(&a.score)),
        }
        matches.truncate(self.top_n);
        Ok(matches)
    }
}
