use anyhow::Context;
use clap::Parser;
use doclink_resolver::utils::error::ErrorSeverity;
use doclink_resolver::utils::{logger, validation::Validate};
use doclink_resolver::{CliConfig, DefaultResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI args: {:?}", cli);

    // 載入並驗證配置
    let config = cli
        .resolver_config()
        .and_then(|config| config.validate().map(|_| config));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let resolver = DefaultResolver::from_config(&config).context("building resolver")?;

    if cli.mirror_only {
        let (document, mirror_url) = match resolver.mirror_link(&cli.source_url) {
            Ok(parts) => parts,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(4);
            }
        };
        if cli.json {
            let output = serde_json::json!({
                "docId": document.doc_id,
                "title": document.title,
                "mirrorUrl": mirror_url.as_str(),
            });
            println!("{}", output);
        } else {
            println!("{}", mirror_url);
        }
        return Ok(());
    }

    match resolver.resolve(&cli.source_url).await {
        Ok(resolution) => {
            if cli.json {
                println!("{}", serde_json::to_string(&resolution)?);
            } else {
                println!("{}", resolution.download_link);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Resolution failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 4,      // 輸入錯誤
                ErrorSeverity::Medium => 2,   // 上游或逾時，可重試
                ErrorSeverity::High => 1,     // 瀏覽器或內部錯誤
                ErrorSeverity::Critical => 3, // 配置錯誤
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
