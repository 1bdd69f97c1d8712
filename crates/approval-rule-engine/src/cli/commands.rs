//! CLI 命令定义

use crate::dto::{RequestType, UserRole};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 审批规则引擎命令行工具
#[derive(Parser, Debug)]
#[command(name = "approval-engine")]
#[command(version, about = "审批规则引擎")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别，覆盖配置文件 (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 评估一次审批申请并输出决策（JSON）
    ///
    /// 事实可以通过 `--facts` 直接给出，也可以通过申请表单参数构造。
    Evaluate {
        /// 事实集合（JSON 对象）
        #[arg(long, conflicts_with_all = ["request_type", "amount", "reason", "role"])]
        facts: Option<String>,

        /// 申请类型 (expense, loan)
        #[arg(short = 't', long = "type", required_unless_present = "facts")]
        request_type: Option<RequestType>,

        /// 申请金额
        #[arg(short, long, required_unless_present = "facts")]
        amount: Option<f64>,

        /// 申请原因
        #[arg(long, required_unless_present = "facts")]
        reason: Option<String>,

        /// 提交人角色 (employee, admin)
        #[arg(long)]
        role: Option<UserRole>,

        /// 规则文件，未指定时使用配置的规则来源
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// 校验规则文件，逐条报告格式错误的规则
    CheckRules {
        /// 规则文件路径（JSON 数组）
        file: PathBuf,
    },

    /// 输出内置默认规则（JSON）
    Defaults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_evaluate_form() {
        let cli = Cli::parse_from([
            "approval-engine",
            "evaluate",
            "--type",
            "expense",
            "--amount",
            "42.5",
            "--reason",
            "Team lunch",
            "--role",
            "admin",
        ]);
        match cli.command {
            Commands::Evaluate {
                facts,
                request_type,
                amount,
                reason,
                role,
                rules,
            } => {
                assert!(facts.is_none());
                assert_eq!(request_type, Some(RequestType::Expense));
                assert_eq!(amount, Some(42.5));
                assert_eq!(reason.as_deref(), Some("Team lunch"));
                assert_eq!(role, Some(UserRole::Admin));
                assert!(rules.is_none());
            }
            _ => panic!("预期 Evaluate 命令"),
        }
    }

    #[test]
    fn test_cli_parse_evaluate_facts() {
        let cli = Cli::parse_from([
            "approval-engine",
            "evaluate",
            "--facts",
            r#"{"amount": 1}"#,
            "--rules",
            "rules.json",
        ]);
        match cli.command {
            Commands::Evaluate { facts, rules, .. } => {
                assert_eq!(facts.as_deref(), Some(r#"{"amount": 1}"#));
                assert_eq!(rules, Some(PathBuf::from("rules.json")));
            }
            _ => panic!("预期 Evaluate 命令"),
        }
    }

    #[test]
    fn test_cli_rejects_incomplete_form() {
        let result = Cli::try_parse_from(["approval-engine", "evaluate", "--type", "loan"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "approval-engine",
            "evaluate",
            "--facts",
            "{}",
            "--amount",
            "10",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_check_rules_and_defaults() {
        let cli = Cli::parse_from(["approval-engine", "-l", "debug", "check-rules", "rules.json"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::CheckRules { file } => assert_eq!(file, PathBuf::from("rules.json")),
            _ => panic!("预期 CheckRules 命令"),
        }

        let cli = Cli::parse_from(["approval-engine", "defaults"]);
        assert!(matches!(cli.command, Commands::Defaults));
    }
}
