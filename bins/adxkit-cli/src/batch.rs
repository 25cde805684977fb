//! 批量转换.
//!
//! 清单为 JSON 文件, 例如:
//!
//! ```json
//! {
//!   "jobs": [
//!     { "mode": "encode", "input": "bgm.wav", "output": "bgm.adx", "loop_start": 0, "loop_end": 441000 },
//!     { "mode": "decode", "input": "voice.ahx", "output": "voice.wav" }
//!   ]
//! }
//! ```
//!
//! 相对路径以清单所在目录为基准. 单个任务失败只记录日志, 不影响其余任务.

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{error, info};
use serde::Deserialize;

use crate::convert::{EncodeOptions, decode_file, encode_file};

/// 批量任务清单
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// 单个转换任务
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Job {
    Decode {
        input: PathBuf,
        output: PathBuf,
        /// 循环区间额外播放的次数
        #[serde(default)]
        loops: u32,
    },
    Encode {
        input: PathBuf,
        output: PathBuf,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        loop_start: Option<u32>,
        #[serde(default)]
        loop_end: Option<u32>,
        #[serde(default)]
        highpass: Option<u16>,
    },
}

impl Job {
    fn input(&self) -> &Path {
        match self {
            Job::Decode { input, .. } | Job::Encode { input, .. } => input,
        }
    }

    fn run(&self, base: &Path) -> anyhow::Result<()> {
        match self {
            Job::Decode {
                input,
                output,
                loops,
            } => {
                decode_file(&base.join(input), &base.join(output), *loops)?;
            }
            Job::Encode {
                input,
                output,
                format,
                loop_start,
                loop_end,
                highpass,
            } => {
                let options = EncodeOptions {
                    format: format.clone(),
                    loop_start: *loop_start,
                    loop_end: *loop_end,
                    highpass: *highpass,
                };
                encode_file(&base.join(input), &base.join(output), &options)?;
            }
        }
        Ok(())
    }
}

/// 批量运行结果
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    /// 失败的输入文件及原因
    pub failures: Vec<(PathBuf, String)>,
}

/// 读取清单文件
pub fn load_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取清单失败: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("解析清单失败: {}", path.display()))
}

/// 依次执行清单中的任务
pub fn run_manifest(manifest: &Manifest, base: &Path) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, job) in manifest.jobs.iter().enumerate() {
        match job.run(base) {
            Ok(()) => report.succeeded += 1,
            Err(e) => {
                error!("任务 #{} ({}) 失败: {:#}", index, job.input().display(), e);
                report.failures.push((job.input().to_path_buf(), format!("{e:#}")));
            }
        }
    }
    info!(
        "批量转换完成: 成功 {}, 失败 {}",
        report.succeeded,
        report.failures.len(),
    );
    report
}
