//! 审批规则引擎命令行入口

use anyhow::Result;
use approval_engine::cli::runner::{EvaluateInput, SubmissionArgs};
use approval_engine::cli::{Cli, CommandRunner, Commands};
use approval_shared::config::AppConfig;
use approval_shared::observability;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 从 config/{service_name}.toml 和 APPROVAL_ 环境变量加载配置
    let mut config = AppConfig::load("approval-rule-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config ({}), using defaults: {}", e.code(), e);
        AppConfig::default()
    });
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    observability::init(&config.observability, &config.service_name)?;

    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::Evaluate {
            facts,
            request_type,
            amount,
            reason,
            role,
            rules,
        } => {
            let input = match (facts, request_type, amount, reason) {
                (Some(json), ..) => EvaluateInput::Facts(json),
                (None, Some(request_type), Some(amount), Some(reason)) => {
                    EvaluateInput::Submission(SubmissionArgs {
                        request_type,
                        amount,
                        reason,
                        role,
                    })
                }
                _ => anyhow::bail!("either --facts or --type/--amount/--reason is required"),
            };
            runner.run_evaluate(input, rules).await?;
        }
        Commands::CheckRules { file } => {
            runner.run_check_rules(&file).await?;
        }
        Commands::Defaults => {
            runner.run_defaults()?;
        }
    }

    Ok(())
}
