// ==========================================
// 家具 BOM 成本核算 - 导入 API
// ==========================================
// 职责: BOM 表格 → 草稿行（导入的行为 Unchecked，等待查重）
// ==========================================

use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::engine::advisory::{AdvisoryError, DraftBom, LineId};
use crate::importer::BomImporter;

/// 导入结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportApiResponse {
    pub imported: usize,
    pub line_ids: Vec<LineId>,
}

#[derive(Default)]
pub struct ImportApi {
    importer: BomImporter,
}

impl ImportApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 导入 BOM 文件并追加到草稿
    ///
    /// 文件任一行出错则不追加任何行
    pub fn import_into_draft(
        &self,
        file_path: &Path,
        draft: &Mutex<DraftBom>,
    ) -> ApiResult<ImportApiResponse> {
        let lines = self.importer.import_file(file_path)?;

        let mut guard = draft
            .lock()
            .map_err(|e| ApiError::from(AdvisoryError::LockError(e.to_string())))?;
        let line_ids: Vec<LineId> = lines.into_iter().map(|line| guard.add_line(line)).collect();

        info!(file = %file_path.display(), imported = line_ids.len(), "BOM 已导入草稿");
        Ok(ImportApiResponse {
            imported: line_ids.len(),
            line_ids,
        })
    }
}
