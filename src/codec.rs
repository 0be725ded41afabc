use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use clap::ValueEnum;
use log::debug;

use crate::error::{CbirError, Result};

/// 特征文件中的一条记录
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub identifier: String,
    pub vector: Vec<f32>,
}

impl FeatureRecord {
    pub fn new(identifier: impl Into<String>, vector: Vec<f32>) -> Self {
        Self { identifier: identifier.into(), vector }
    }
}

/// 写入方式，由调用者决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 清空文件后写入
    Truncate,
    /// 追加到文件末尾
    Append,
}

/// 浮点数的文本格式
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatFormat {
    /// 能无损还原的最短表示
    #[default]
    Shortest,
    /// 与 C++ 流输出一致的 6 位有效数字
    Legacy,
}

/// 特征文件编解码器
///
/// 每行格式为 `identifier,v0,v1,...,vk`。
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCodec {
    format: FloatFormat,
}

impl FeatureCodec {
    pub fn new(format: FloatFormat) -> Self {
        Self { format }
    }

    /// 将一条记录编码为一行文本，不含换行符
    pub fn encode(&self, record: &FeatureRecord) -> String {
        let mut line = record.identifier.clone();
        for &v in &record.vector {
            line.push(',');
            match self.format {
                FloatFormat::Shortest => line.push_str(&v.to_string()),
                FloatFormat::Legacy => line.push_str(&format_general(v)),
            }
        }
        line
    }

    /// 写入一条记录
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        record: &FeatureRecord,
        mode: WriteMode,
    ) -> Result<()> {
        let mut file = open_store(path.as_ref(), mode)?;
        writeln!(file, "{}", self.encode(record))?;
        Ok(())
    }
}

fn open_store(path: &Path, mode: WriteMode) -> Result<File> {
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Truncate => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    Ok(options.open(path)?)
}

/// 解析一行文本，字段两侧的空白会被忽略
pub fn decode(line: &str) -> std::result::Result<FeatureRecord, String> {
    let mut fields = line.split(',').map(str::trim);
    let identifier = match fields.next() {
        Some(identifier) if !identifier.is_empty() => identifier.to_string(),
        _ => return Err("缺少图片标识".to_string()),
    };
    let vector = fields
        .enumerate()
        .map(|(i, field)| {
            field.parse::<f32>().map_err(|e| format!("第 {} 个数值 {:?}: {}", i + 1, field, e))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(FeatureRecord { identifier, vector })
}

/// 读取特征文件，跳过空行
pub fn read_store(path: impl AsRef<Path>) -> Result<Vec<FeatureRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut records = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = decode(line).map_err(|reason| CbirError::CsvParse { line: i + 1, reason })?;
        records.push(record);
    }
    debug!("从 {} 读取 {} 条记录", path.display(), records.len());
    Ok(records)
}

/// 按 `%g` 规则输出 6 位有效数字
fn format_general(v: f32) -> String {
    const PRECISION: i32 = 6;

    if v == 0. {
        return if v.is_sign_negative() {
            "-0".to_string()
        } else {
            "0".to_string()
        };
    }
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0. {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
