use thiserror::Error;

#[derive(Error, Debug)]
pub enum FocusLensError {
    #[error("设置错误: {0}")]
    Config(String),

    #[error("未配置 API Key。请使用 `focuslens config --set-api-key YOUR_KEY` 进行设置")]
    MissingApiKey,

    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("未找到图片: {0}")]
    NoImagesFound(String),

    #[error("图片读取错误: {0}")]
    ImageLoad(String),

    #[error("评审失败: {0}")]
    EvaluationFailed(String),

    #[error("历史记录不存在: {0}")]
    HistoryNotFound(String),

    #[error("HTTP错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析错误: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("服务器错误: {0}")]
    Server(String),

    #[error("交互输入错误: {0}")]
    Prompt(String),

    #[error(transparent)]
    Common(#[from] focuslens_common::Error),
}

impl From<dialoguer::Error> for FocusLensError {
    fn from(e: dialoguer::Error) -> Self {
        FocusLensError::Prompt(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FocusLensError>;
