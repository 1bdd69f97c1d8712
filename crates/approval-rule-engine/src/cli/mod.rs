//! CLI 模块
//!
//! - `evaluate` - 评估一次审批申请
//! - `check-rules` - 校验规则文件
//! - `defaults` - 输出内置默认规则
//!
//! # 使用示例
//!
//! ```bash
//! # 按申请表单评估
//! approval-engine evaluate --type expense --amount 42.5 --reason "Team lunch" --role employee
//!
//! # 直接传入事实，使用指定规则文件
//! approval-engine evaluate --facts '{"amount": 800, "type": "loan"}' --rules rules.json
//!
//! # 校验规则文件
//! approval-engine check-rules rules.json
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
