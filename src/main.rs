use std::sync::Arc;

use anyhow::{bail, Result};

use revify::config::Config;
use revify::logger;
use revify::models::{Phase, ProductIdentity};
use revify::orchestrator::Orchestrator;
use revify::scraper::AmazonReviewSource;
use revify::services::OpenAiInference;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 命令行参数：<商品URL> [商品名称]
    let mut args = std::env::args().skip(1);
    let url = match args.next() {
        Some(url) => url,
        None => bail!("用法: revify <商品URL> [商品名称]"),
    };
    let identity = ProductIdentity::new(url, args.next())?;

    let inference = Arc::new(OpenAiInference::new(&config));
    let source = Arc::new(AmazonReviewSource::new(&config));
    let orchestrator = Orchestrator::new(config, inference, source);

    orchestrator.start(identity, None)?;
    orchestrator.wait().await;

    let status = orchestrator.status();
    match status.phase {
        Phase::Done => {
            if let Some(result) = status.result {
                println!("分析完成，结果已写入: {}", result.output_file);
                for record in &result.analysis {
                    println!(
                        "- {} [{}] {}",
                        record.feature, record.sentiment, record.verdict
                    );
                }
            }
            Ok(())
        }
        _ => bail!(
            "分析失败: {}",
            status.error.unwrap_or_else(|| "未知错误".to_string())
        ),
    }
}
