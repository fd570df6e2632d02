use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ic_memo::utils::logging;
use ic_memo::{App, Config, DocumentOutcome, GenerateOptions};

/// 从投资资料生成 IC Memo 文档
#[derive(Parser)]
#[command(name = "ic-memo", version, about)]
struct Cli {
    /// 配置文件路径（默认 ./ic_memo.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 提取字段并创建文档
    Generate {
        /// 上传的文件（pdf, xlsx, xls, csv, txt, md, png, jpg, jpeg）
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 已经拿到的 OAuth 授权码
        #[arg(long, env = "GOOGLE_AUTH_CODE")]
        auth_code: Option<String>,

        /// 只在本地渲染文档，不调用 Docs API
        #[arg(long)]
        dry_run: bool,

        /// 将提取结果写入 JSON 文件
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
    /// 单次向模型提问
    Ask { prompt: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    let app = App::new(config);

    match cli.command {
        Command::Generate {
            files,
            auth_code,
            dry_run,
            json_out,
        } => {
            let options = GenerateOptions {
                paths: files,
                auth_code,
                dry_run,
                json_out,
            };
            let report = app.generate(&options).await?;

            for rejected in &report.rejected {
                eprintln!("{}", rejected);
            }
            match &report.document {
                DocumentOutcome::Created { url } => println!("{}", url),
                DocumentOutcome::Preview { text } => println!("{}", text),
                DocumentOutcome::Failed(e) => eprintln!("{}", e),
            }
            println!("{}", logging::format_run_summary(&report.summary));

            if report.document.is_failed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ask { prompt } => {
            let (answer, summary) = app.ask(&prompt).await?;
            println!("{}", answer);
            println!("{}", logging::format_run_summary(&summary));
        }
    }

    Ok(ExitCode::SUCCESS)
}
