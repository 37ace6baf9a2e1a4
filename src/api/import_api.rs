// ==========================================
// 故障知识库 - 批量导入 API
// ==========================================
// 职责: 上传暂存 + 预览 / 按列映射执行导入
// 约束: 上传文件只落在 upload_dir 内；执行后临时文件一律删除
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::import::{ColumnMapping, FilePreview, ImportSummary};
use crate::importer::error::ImportError;
use crate::importer::{remove_upload, EntryImporter, SourceFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 上传预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPreview {
    #[serde(flatten)]
    pub preview: FilePreview,
    /// 暂存文件路径（执行导入时回传）
    pub file_path: String,
}

/// 执行导入请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub file_path: String,
    #[serde(default)]
    pub mapping: ColumnMapping,
}

/// 导入API
pub struct ImportApi {
    importer: Arc<dyn EntryImporter>,
    upload_dir: PathBuf,
    max_upload_bytes: u64,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    ///
    /// # 参数
    /// - importer: 条目导入器
    /// - upload_dir: 上传暂存目录
    /// - max_upload_bytes: 单文件大小上限
    pub fn new(importer: Arc<dyn EntryImporter>, upload_dir: PathBuf, max_upload_bytes: u64) -> Self {
        Self {
            importer,
            upload_dir,
            max_upload_bytes,
        }
    }

    /// 上传文件并生成预览
    ///
    /// # 参数
    /// - original_name: 客户端文件名（决定解析格式）
    /// - bytes: 文件内容
    ///
    /// # 返回
    /// - Ok(UploadPreview): 列清单 / 前 5 行 / 总行数 / 原始文件名 / 暂存路径
    /// - Err(ApiError): 格式不支持、超限、解析失败
    pub async fn upload(&self, original_name: &str, bytes: &[u8]) -> ApiResult<UploadPreview> {
        // 格式校验先于落盘
        SourceFormat::from_path(Path::new(original_name))?;
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let size = bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            }
            .into());
        }

        std::fs::create_dir_all(&self.upload_dir).map_err(ImportError::from)?;
        let stored = self
            .upload_dir
            .join(format!("{}.{}", uuid::Uuid::new_v4(), ext));
        std::fs::write(&stored, bytes).map_err(ImportError::from)?;
        info!(file = %stored.display(), original = original_name, size, "上传文件已暂存");

        match self.importer.preview(&stored).await {
            Ok(mut preview) => {
                preview.file_name = original_name.to_string();
                Ok(UploadPreview {
                    preview,
                    file_path: stored.to_string_lossy().to_string(),
                })
            }
            Err(e) => {
                remove_upload(&stored);
                Err(e.into())
            }
        }
    }

    /// 按列映射执行导入
    ///
    /// # 返回
    /// - Ok(ImportSummary): `{imported, skipped, errors}`
    /// - Err(ApiError): 路径越界 / 映射缺失 / 解析失败 (400)，存储致命错误 (500)
    pub async fn execute(&self, request: &ExecuteRequest) -> ApiResult<ImportSummary> {
        let path = self.resolve_upload_path(&request.file_path)?;
        Ok(self.importer.execute(&path, &request.mapping).await?)
    }

    /// 校验暂存路径位于 upload_dir 内（越界时不触碰文件）
    fn resolve_upload_path(&self, raw: &str) -> ApiResult<PathBuf> {
        let outside = || ApiError::from(ImportError::PathOutsideUploadDir(raw.to_string()));

        if raw.trim().is_empty() {
            return Err(ApiError::InvalidInput("filePath is required".to_string()));
        }

        let root = self.upload_dir.canonicalize().map_err(|_| outside())?;
        let candidate = Path::new(raw);
        let resolved = match candidate.canonicalize() {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImportError::FileNotFound(raw.to_string()).into());
            }
            Err(_) => return Err(outside()),
        };

        if resolved.starts_with(&root) && resolved != root {
            Ok(resolved)
        } else {
            warn!(path = raw, "拒绝上传目录之外的导入路径");
            Err(outside())
        }
    }
}
