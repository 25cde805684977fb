//! adxkit - CRI ADX/AHX 命令行工具
//!
//! 提供 WAV 与 ADX/AHX 之间的转换、批量转换和头部探测.

mod batch;
mod convert;
mod logging;
mod probe;
mod wav;

use std::path::{Path, PathBuf};
use std::process;

use adxkit_codec::StreamHeader;
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::error;

use convert::{EncodeOptions, decode_file, encode_file};
use probe::ProbeOutput;

#[derive(Parser, Debug)]
#[command(name = "adxkit", version, about = "纯 Rust CRI ADX/AHX 音频工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// ADX/AHX → 16 位 PCM WAV
    Decode {
        /// 输入文件
        input: PathBuf,
        /// 输出 WAV 文件
        #[arg(short, long)]
        output: PathBuf,
        /// 循环区间额外播放的次数
        #[arg(long, default_value_t = 0)]
        loops: u32,
    },
    /// 16 位 PCM WAV → ADX/AHX
    Encode {
        /// 输入 WAV 文件
        input: PathBuf,
        /// 输出文件
        #[arg(short, long)]
        output: PathBuf,
        /// 输出格式 (adx / ahx), 默认按扩展名推断
        #[arg(short, long)]
        format: Option<String>,
        /// 循环起点 (采样)
        #[arg(long, requires = "loop_end")]
        loop_start: Option<u32>,
        /// 循环终点 (采样, 不含)
        #[arg(long, requires = "loop_start")]
        loop_end: Option<u32>,
        /// 高通截止频率 (Hz, 仅 ADX)
        #[arg(long)]
        highpass: Option<u16>,
    },
    /// 显示文件头部信息
    Probe {
        /// 输入文件
        input: PathBuf,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 按 JSON 清单批量转换
    Batch {
        /// 清单文件
        manifest: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("adxkit", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if let Err(e) = run(cli.command) {
        error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Decode {
            input,
            output,
            loops,
        } => {
            decode_file(&input, &output, loops)?;
        }
        Command::Encode {
            input,
            output,
            format,
            loop_start,
            loop_end,
            highpass,
        } => {
            let options = EncodeOptions {
                format,
                loop_start,
                loop_end,
                highpass,
            };
            encode_file(&input, &output, &options)?;
        }
        Command::Probe { input, json } => probe_file(&input, json)?,
        Command::Batch { manifest } => {
            let loaded = batch::load_manifest(&manifest)?;
            let base = manifest.parent().unwrap_or(Path::new("."));
            let report = batch::run_manifest(&loaded, base);
            for (path, reason) in &report.failures {
                eprintln!("失败: {}: {}", path.display(), reason);
            }
            if !report.failures.is_empty() {
                anyhow::bail!(
                    "{} 个任务失败 (成功 {})",
                    report.failures.len(),
                    report.succeeded,
                );
            }
        }
    }
    Ok(())
}

fn probe_file(input: &Path, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read(input).with_context(|| format!("读取输入文件失败: {}", input.display()))?;
    let header = StreamHeader::parse(&data).with_context(|| format!("无法解析 {}", input.display()))?;
    let output = ProbeOutput::new(&input.display().to_string(), &header);
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output.print_text();
    }
    Ok(())
}
