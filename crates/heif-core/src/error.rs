//! 统一错误类型定义.
//!
//! 所有 HEIF crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

use crate::ItemId;

/// HEIF 编解码配置层统一错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeifError {
    /// 二进制输入截断或格式错误 (含比特流越界)
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 配置记录无法表达的内容 (版本号错误, 不支持的位深/色度等)
    #[error("不支持的配置: {0}")]
    UnsupportedConfiguration(String),

    /// 外部编码器插件报告失败
    #[error("编码器失败: {0}")]
    EncoderFailure(String),

    /// 外部解码器插件报告失败或没有输出图像
    #[error("解码器失败: {0}")]
    DecoderFailure(String),

    /// 未找到指定的图像项
    #[error("未找到图像项: id={0}")]
    ItemNotFound(ItemId),

    /// 图像项缺少可用的编解码配置
    #[error("缺少编解码配置: {0}")]
    MissingConfiguration(String),

    /// 无效参数 (调用方错误)
    #[error("无效参数: {0}")]
    InvalidArgument(String),
}

impl HeifError {
    /// 为错误附加失败阶段, 错误类别保持不变
    ///
    /// ```
    /// use heif_core::HeifError;
    ///
    /// let err = HeifError::ParseError("Exp-Golomb 过长".into()).in_stage("SPS 解析");
    /// assert_eq!(err, HeifError::ParseError("SPS 解析: Exp-Golomb 过长".into()));
    /// ```
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            Self::ParseError(msg) => Self::ParseError(format!("{stage}: {msg}")),
            Self::UnsupportedConfiguration(msg) => {
                Self::UnsupportedConfiguration(format!("{stage}: {msg}"))
            }
            Self::EncoderFailure(msg) => Self::EncoderFailure(format!("{stage}: {msg}")),
            Self::DecoderFailure(msg) => Self::DecoderFailure(format!("{stage}: {msg}")),
            Self::MissingConfiguration(msg) => {
                Self::MissingConfiguration(format!("{stage}: {msg}"))
            }
            Self::InvalidArgument(msg) => Self::InvalidArgument(format!("{stage}: {msg}")),
            // 图像项 ID 本身已足够定位
            Self::ItemNotFound(id) => Self::ItemNotFound(id),
        }
    }
}

/// HEIF 统一 Result 类型
pub type HeifResult<T> = Result<T, HeifError>;

/// 为 `HeifResult` 附加失败阶段
pub trait ResultExt<T> {
    /// 出错时附加阶段名称
    fn stage(self, stage: &str) -> HeifResult<T>;
}

impl<T> ResultExt<T> for HeifResult<T> {
    fn stage(self, stage: &str) -> HeifResult<T> {
        self.map_err(|e| e.in_stage(stage))
    }
}
