// ==========================================
// 家具 BOM 成本核算 - 查重防抖调度
// ==========================================
// 每行一个延时任务；同一行的新编辑取消旧任务
// 静默期结束后: begin_check → 目录查询 → apply_check_result
// 过期结果由 DraftBom 的 generation 校验丢弃
// ==========================================

use crate::catalog::CatalogGateway;
use crate::engine::advisory::{AdvisoryError, AdvisoryResult, CheckOutcome, DraftBom, LineId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 默认静默期（毫秒）
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

pub struct SimilarityDebouncer {
    draft: Arc<Mutex<DraftBom>>,
    gateway: Arc<dyn CatalogGateway>,
    delay: Duration,
    pending: Mutex<HashMap<LineId, JoinHandle<()>>>,
}

impl SimilarityDebouncer {
    pub fn new(draft: Arc<Mutex<DraftBom>>, gateway: Arc<dyn CatalogGateway>, delay: Duration) -> Self {
        Self {
            draft,
            gateway,
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn draft(&self) -> &Arc<Mutex<DraftBom>> {
        &self.draft
    }

    /// 安排一次查重（取消该行尚未触发的旧任务）
    ///
    /// 必须在 tokio 运行时内调用
    pub fn schedule(&self, line_id: LineId) {
        let draft = Arc::clone(&self.draft);
        let gateway = Arc::clone(&self.gateway);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = run_check(&draft, gateway.as_ref(), line_id).await {
                warn!(%line_id, error = %e, "防抖查重未执行");
            }
        });

        match self.pending.lock() {
            Ok(mut pending) => {
                pending.retain(|_, h| !h.is_finished());
                if let Some(previous) = pending.insert(line_id, handle) {
                    previous.abort();
                    debug!(%line_id, "取消上一次待执行的查重");
                }
            }
            Err(e) => {
                warn!(%line_id, error = %e, "防抖任务表锁失败，放弃调度");
                handle.abort();
            }
        }
    }

    /// 取消该行待执行的查重
    pub fn cancel(&self, line_id: LineId) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.remove(&line_id) {
                handle.abort();
            }
        }
    }

    /// 立即查重（取消待执行任务）
    pub async fn flush(&self, line_id: LineId) -> AdvisoryResult<Option<CheckOutcome>> {
        self.cancel(line_id);
        run_check(&self.draft, self.gateway.as_ref(), line_id).await
    }

    /// 尚未完成的防抖任务数
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .map(|p| p.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

impl Drop for SimilarityDebouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, handle) in pending.drain() {
                handle.abort();
            }
        }
    }
}

/// 执行一次查重
///
/// # 返回
/// - Ok(None): 非刚性材质，已直接置为 Clear
/// - Ok(Some(outcome)): 查询结果已应用或被丢弃
/// - Err(LineNotFound): 行已删除
pub async fn run_check(
    draft: &Mutex<DraftBom>,
    gateway: &dyn CatalogGateway,
    line_id: LineId,
) -> AdvisoryResult<Option<CheckOutcome>> {
    let ticket = {
        let mut guard = draft
            .lock()
            .map_err(|e| AdvisoryError::LockError(e.to_string()))?;
        guard.begin_check(line_id)?
    };
    let Some(ticket) = ticket else {
        return Ok(None);
    };

    debug!(%line_id, generation = ticket.generation, "查询相似组件");
    let result = gateway
        .search_similar_components(&ticket.query)
        .await
        .map_err(|e| e.to_string());

    let mut guard = draft
        .lock()
        .map_err(|e| AdvisoryError::LockError(e.to_string()))?;
    Ok(Some(guard.apply_check_result(&ticket, result)))
}
