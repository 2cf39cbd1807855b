//! 错误类型
//!
//! 控制器错误全部在 UI 层就地吸收，只有配置和终端错误会让程序退出。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::controller::ViewKind;

/// 控制器操作被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("unknown companion `{0}`")]
    InvalidSelection(String),

    #[error("message is blank")]
    EmptyInput,

    #[error("`{event}` is not allowed while in {from:?}")]
    InvalidTransition { event: &'static str, from: ViewKind },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install logger: {0}")]
    Logging(String),
}
