// ==========================================
// 家具 BOM 成本核算 - 组件查重状态机 / 草稿工作集
// ==========================================
// 职责: 维护编辑中的 BOM 草稿行，每行带显式查重状态
// ==========================================
// 状态机:
//   Unchecked ──(防抖后)──▶ Checking
//   Checking  ──无命中──▶ Clear
//   Checking  ──有命中──▶ PendingReview（阻断提交）
//   Checking  ──查询失败──▶ CheckFailed（提交前重试）
//   PendingReview ──复用已有──▶ ResolvedExisting
//   PendingReview ──确认新建──▶ ResolvedNew
//   尺寸/材质变更 ──▶ Unchecked
// ==========================================
// 异步结果用 (line_id, generation) 标记；
// 行被删除或 generation 前移后到达的结果一律丢弃
// ==========================================

use crate::domain::component::{ComponentLine, SimilarMatch};
use crate::engine::similarity::SimilarityQuery;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

// ==========================================
// LineId - 草稿行稳定标识
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineId(pub u64);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

// ==========================================
// AdvisoryState - 查重状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvisoryState {
    Unchecked,
    Checking,
    Clear,
    PendingReview { matches: Vec<SimilarMatch> },
    ResolvedExisting { component_id: String, cost: Decimal },
    ResolvedNew,
    CheckFailed { reason: String },
}

impl AdvisoryState {
    pub fn name(&self) -> &'static str {
        match self {
            AdvisoryState::Unchecked => "UNCHECKED",
            AdvisoryState::Checking => "CHECKING",
            AdvisoryState::Clear => "CLEAR",
            AdvisoryState::PendingReview { .. } => "PENDING_REVIEW",
            AdvisoryState::ResolvedExisting { .. } => "RESOLVED_EXISTING",
            AdvisoryState::ResolvedNew => "RESOLVED_NEW",
            AdvisoryState::CheckFailed { .. } => "CHECK_FAILED",
        }
    }

    /// 该状态下是否允许提交
    pub fn allows_submission(&self) -> bool {
        matches!(
            self,
            AdvisoryState::Clear | AdvisoryState::ResolvedExisting { .. } | AdvisoryState::ResolvedNew
        )
    }
}

/// 查重状态机错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvisoryError {
    #[error("草稿行不存在: {0}")]
    LineNotFound(LineId),

    #[error("无效的查重状态转换: line={line_id}, from={from}, action={action}")]
    InvalidTransition {
        line_id: LineId,
        from: &'static str,
        action: &'static str,
    },

    #[error("所选组件不在候选列表中: line={line_id}, component_id={component_id}")]
    UnknownMatch { line_id: LineId, component_id: String },

    #[error("存在未处理的相似组件: {0:?}")]
    UnresolvedSimilarMatches(Vec<LineId>),

    #[error("查重进行中: {0:?}")]
    ChecksInFlight(Vec<LineId>),

    #[error("已有提交进行中")]
    SubmissionInFlight,

    #[error("草稿锁获取失败: {0}")]
    LockError(String),
}

pub type AdvisoryResult<T> = Result<T, AdvisoryError>;

// ==========================================
// DraftLine - 草稿行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLine {
    pub line: ComponentLine,
    pub state: AdvisoryState,
    /// 每次影响查重的编辑 +1
    pub generation: u64,
}

/// 一次查重请求的凭据
#[derive(Debug, Clone, PartialEq)]
pub struct CheckTicket {
    pub line_id: LineId,
    pub generation: u64,
    pub query: SimilarityQuery,
}

/// 异步结果的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Applied,
    Discarded,
}

/// 提交凭据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub seq: u64,
}

// ==========================================
// DraftBom - 草稿工作集
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DraftBom {
    lines: BTreeMap<LineId, DraftLine>,
    next_line_id: u64,
    tolerance_pct: f64,
    submission_seq: u64,
    in_flight_submission: Option<u64>,
}

impl DraftBom {
    /// 创建草稿（容差百分比用于后续查重请求）
    pub fn new(tolerance_pct: f64) -> Self {
        Self {
            lines: BTreeMap::new(),
            next_line_id: 1,
            tolerance_pct,
            submission_seq: 0,
            in_flight_submission: None,
        }
    }

    pub fn tolerance_pct(&self) -> f64 {
        self.tolerance_pct
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, line_id: LineId) -> Option<&DraftLine> {
        self.lines.get(&line_id)
    }

    /// 按添加顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&LineId, &DraftLine)> {
        self.lines.iter()
    }

    pub fn state(&self, line_id: LineId) -> Option<&AdvisoryState> {
        self.lines.get(&line_id).map(|l| &l.state)
    }

    fn line_mut(&mut self, line_id: LineId) -> AdvisoryResult<&mut DraftLine> {
        self.lines
            .get_mut(&line_id)
            .ok_or(AdvisoryError::LineNotFound(line_id))
    }

    // ==========================================
    // 编辑
    // ==========================================

    /// 新增一行（初始状态 Unchecked）
    pub fn add_line(&mut self, line: ComponentLine) -> LineId {
        let line_id = LineId(self.next_line_id);
        self.next_line_id += 1;
        self.lines.insert(
            line_id,
            DraftLine {
                line,
                state: AdvisoryState::Unchecked,
                generation: 0,
            },
        );
        debug!(%line_id, "新增草稿行");
        line_id
    }

    /// 更新一行
    ///
    /// # 返回
    /// - true: 尺寸/材质签名变化，状态回到 Unchecked（需要重新查重）
    /// - false: 仅非尺寸字段变化，状态保持
    pub fn update_line(&mut self, line_id: LineId, line: ComponentLine) -> AdvisoryResult<bool> {
        let draft = self.line_mut(line_id)?;
        let changed = draft.line.dimension_signature() != line.dimension_signature();

        draft.line = line;
        if changed {
            draft.generation += 1;
            draft.state = AdvisoryState::Unchecked;
            draft.line.component_id = None;
            debug!(%line_id, generation = draft.generation, "尺寸变更，查重状态重置");
        }
        Ok(changed)
    }

    /// 删除一行（在途查重结果随之作废）
    pub fn remove_line(&mut self, line_id: LineId) -> AdvisoryResult<DraftLine> {
        self.lines
            .remove(&line_id)
            .ok_or(AdvisoryError::LineNotFound(line_id))
    }

    // ==========================================
    // 查重
    // ==========================================

    /// 开始查重
    ///
    /// # 返回
    /// - Some(ticket): 状态 → Checking，调用方带着凭据去查询
    /// - None: 非刚性材质，直接 Clear
    pub fn begin_check(&mut self, line_id: LineId) -> AdvisoryResult<Option<CheckTicket>> {
        let tolerance_pct = self.tolerance_pct;
        let draft = self.line_mut(line_id)?;

        if !draft.line.sub_component.is_rigid() {
            draft.state = AdvisoryState::Clear;
            return Ok(None);
        }

        draft.state = AdvisoryState::Checking;
        Ok(Some(CheckTicket {
            line_id,
            generation: draft.generation,
            query: SimilarityQuery::new(
                draft.line.sub_component,
                draft.line.length_mm(),
                draft.line.width_mm(),
                draft.line.thickness,
                tolerance_pct,
            ),
        }))
    }

    /// 应用查重结果
    ///
    /// 行已删除、generation 已前移或状态不再是 Checking → 丢弃
    pub fn apply_check_result(
        &mut self,
        ticket: &CheckTicket,
        result: Result<Vec<SimilarMatch>, String>,
    ) -> CheckOutcome {
        let Some(draft) = self.lines.get_mut(&ticket.line_id) else {
            warn!(line_id = %ticket.line_id, "草稿行已删除，丢弃查重结果");
            return CheckOutcome::Discarded;
        };
        if draft.generation != ticket.generation || draft.state != AdvisoryState::Checking {
            warn!(
                line_id = %ticket.line_id,
                ticket_generation = ticket.generation,
                current_generation = draft.generation,
                state = draft.state.name(),
                "查重结果已过期，丢弃"
            );
            return CheckOutcome::Discarded;
        }

        draft.state = match result {
            Ok(matches) if matches.is_empty() => AdvisoryState::Clear,
            Ok(matches) => {
                info!(line_id = %ticket.line_id, count = matches.len(), "发现相似组件，等待确认");
                AdvisoryState::PendingReview { matches }
            }
            Err(reason) => {
                warn!(line_id = %ticket.line_id, %reason, "查重失败");
                AdvisoryState::CheckFailed { reason }
            }
        };
        CheckOutcome::Applied
    }

    // ==========================================
    // 人工确认
    // ==========================================

    /// 复用已有组件：用候选的尺寸与编号覆盖草稿行
    pub fn use_existing(&mut self, line_id: LineId, component_id: &str) -> AdvisoryResult<()> {
        let draft = self.line_mut(line_id)?;
        let chosen = match &draft.state {
            AdvisoryState::PendingReview { matches } => matches
                .iter()
                .find(|m| m.component_id == component_id)
                .cloned()
                .ok_or_else(|| AdvisoryError::UnknownMatch {
                    line_id,
                    component_id: component_id.to_string(),
                })?,
            other => {
                return Err(AdvisoryError::InvalidTransition {
                    line_id,
                    from: other.name(),
                    action: "use_existing",
                })
            }
        };

        draft.line.length = Some(chosen.length);
        draft.line.width = Some(chosen.width);
        draft.line.thickness = if chosen.thickness > 0.0 {
            Some(chosen.thickness)
        } else {
            None
        };
        draft.line.component_id = Some(chosen.component_id.clone());
        draft.state = AdvisoryState::ResolvedExisting {
            component_id: chosen.component_id,
            cost: chosen.cost,
        };
        info!(%line_id, component_id, "复用已有组件");
        Ok(())
    }

    /// 确认新建组件
    pub fn confirm_new(&mut self, line_id: LineId) -> AdvisoryResult<()> {
        let draft = self.line_mut(line_id)?;
        if !matches!(draft.state, AdvisoryState::PendingReview { .. }) {
            return Err(AdvisoryError::InvalidTransition {
                line_id,
                from: draft.state.name(),
                action: "confirm_new",
            });
        }
        draft.state = AdvisoryState::ResolvedNew;
        info!(%line_id, "确认新建组件");
        Ok(())
    }

    // ==========================================
    // 提交闸门
    // ==========================================

    /// 仍需查重的行（Unchecked / CheckFailed 的刚性材质行）
    pub fn lines_needing_check(&self) -> Vec<LineId> {
        self.lines
            .iter()
            .filter(|(_, d)| {
                matches!(
                    d.state,
                    AdvisoryState::Unchecked | AdvisoryState::CheckFailed { .. }
                )
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// 提交前检查
    ///
    /// - 任一行 PendingReview → UnresolvedSimilarMatches（带行号，供前端高亮）
    /// - 任一行仍在 Checking / 未查重 → ChecksInFlight
    pub fn submission_gate(&self) -> AdvisoryResult<()> {
        let pending: Vec<LineId> = self
            .lines
            .iter()
            .filter(|(_, d)| matches!(d.state, AdvisoryState::PendingReview { .. }))
            .map(|(id, _)| *id)
            .collect();
        if !pending.is_empty() {
            return Err(AdvisoryError::UnresolvedSimilarMatches(pending));
        }

        let unsettled: Vec<LineId> = self
            .lines
            .iter()
            .filter(|(_, d)| !d.state.allows_submission())
            .map(|(id, _)| *id)
            .collect();
        if !unsettled.is_empty() {
            return Err(AdvisoryError::ChecksInFlight(unsettled));
        }
        Ok(())
    }

    /// 导出提交用的组件行（按添加顺序）
    ///
    /// ResolvedExisting 行带 component_id；ResolvedNew/Clear 行不带
    pub fn submission_lines(&self) -> Vec<(LineId, ComponentLine, Option<Decimal>)> {
        self.lines
            .iter()
            .map(|(id, d)| {
                let catalog_cost = match &d.state {
                    AdvisoryState::ResolvedExisting { cost, .. } => Some(*cost),
                    _ => None,
                };
                (*id, d.line.clone(), catalog_cost)
            })
            .collect()
    }

    /// 开始提交（同一草稿同时只允许一个在途提交）
    pub fn begin_submission(&mut self) -> AdvisoryResult<SubmissionTicket> {
        if self.in_flight_submission.is_some() {
            return Err(AdvisoryError::SubmissionInFlight);
        }
        self.submission_seq += 1;
        self.in_flight_submission = Some(self.submission_seq);
        Ok(SubmissionTicket {
            seq: self.submission_seq,
        })
    }

    /// 结束提交
    ///
    /// # 返回
    /// - true: 凭据有效，结果可采用
    /// - false: 过期凭据（已被取消或重复），结果应丢弃
    pub fn finish_submission(&mut self, ticket: SubmissionTicket) -> bool {
        if self.in_flight_submission == Some(ticket.seq) {
            self.in_flight_submission = None;
            true
        } else {
            warn!(seq = ticket.seq, "提交结果已过期，丢弃");
            false
        }
    }

    /// 放弃在途提交（失败后允许重新提交）
    pub fn abort_submission(&mut self, ticket: SubmissionTicket) {
        if self.in_flight_submission == Some(ticket.seq) {
            self.in_flight_submission = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SubComponent;
    use rust_decimal_macros::dec;

    fn alu_leg() -> ComponentLine {
        ComponentLine::new("LEGS", SubComponent::Aluminum, "Leg")
            .with_dimensions(600.0, 40.0, Some(2.0))
            .with_quantity(4)
    }

    fn found(id: &str) -> SimilarMatch {
        SimilarMatch {
            component_id: id.to_string(),
            sub_component: SubComponent::Aluminum,
            length: 600.0,
            width: 44.0,
            thickness: 2.0,
            cost: dec!(3.75),
            times_used: 5,
            is_exact: false,
            deviation: 0.1,
        }
    }

    fn draft_with_leg() -> (DraftBom, LineId) {
        let mut draft = DraftBom::new(10.0);
        let id = draft.add_line(alu_leg());
        (draft, id)
    }

    #[test]
    fn test_clear_when_no_matches() {
        let (mut draft, id) = draft_with_leg();
        assert_eq!(draft.state(id), Some(&AdvisoryState::Unchecked));

        let ticket = draft.begin_check(id).unwrap().unwrap();
        assert_eq!(ticket.query.tolerance_pct, 10.0);
        assert_eq!(draft.state(id), Some(&AdvisoryState::Checking));

        assert_eq!(draft.apply_check_result(&ticket, Ok(vec![])), CheckOutcome::Applied);
        assert_eq!(draft.state(id), Some(&AdvisoryState::Clear));
        assert!(draft.submission_gate().is_ok());
    }

    #[test]
    fn test_exempt_line_goes_straight_to_clear() {
        let mut draft = DraftBom::new(10.0);
        let id = draft.add_line(ComponentLine::new("SEAT", SubComponent::Fabric, "Cover"));
        assert!(draft.begin_check(id).unwrap().is_none());
        assert_eq!(draft.state(id), Some(&AdvisoryState::Clear));
    }

    #[test]
    fn test_pending_review_blocks_submission() {
        let (mut draft, id) = draft_with_leg();
        let other = draft.add_line(ComponentLine::new("SEAT", SubComponent::Foam, "Pad"));
        draft.begin_check(other).unwrap();

        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Ok(vec![found("C-1")]));

        assert_eq!(
            draft.submission_gate(),
            Err(AdvisoryError::UnresolvedSimilarMatches(vec![id]))
        );
    }

    #[test]
    fn test_use_existing_overwrites_dimensions() {
        let (mut draft, id) = draft_with_leg();
        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Ok(vec![found("C-1")]));

        draft.use_existing(id, "C-1").unwrap();
        let line = &draft.get(id).unwrap().line;
        assert_eq!(line.width, Some(44.0));
        assert_eq!(line.component_id.as_deref(), Some("C-1"));
        assert!(draft.submission_gate().is_ok());

        let (_, _, cost) = draft.submission_lines().remove(0);
        assert_eq!(cost, Some(dec!(3.75)));
    }

    #[test]
    fn test_use_existing_unknown_component() {
        let (mut draft, id) = draft_with_leg();
        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Ok(vec![found("C-1")]));
        assert!(matches!(
            draft.use_existing(id, "C-404"),
            Err(AdvisoryError::UnknownMatch { .. })
        ));
    }

    #[test]
    fn test_confirm_new_requires_pending_review() {
        let (mut draft, id) = draft_with_leg();
        assert!(matches!(
            draft.confirm_new(id),
            Err(AdvisoryError::InvalidTransition { from: "UNCHECKED", .. })
        ));

        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Ok(vec![found("C-1")]));
        draft.confirm_new(id).unwrap();
        assert_eq!(draft.state(id), Some(&AdvisoryState::ResolvedNew));
    }

    #[test]
    fn test_dimension_edit_resets_resolved_line() {
        let (mut draft, id) = draft_with_leg();
        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Ok(vec![found("C-1")]));
        draft.use_existing(id, "C-1").unwrap();

        let mut edited = draft.get(id).unwrap().line.clone();
        edited.length = Some(650.0);
        assert!(draft.update_line(id, edited).unwrap());
        assert_eq!(draft.state(id), Some(&AdvisoryState::Unchecked));
        assert_eq!(draft.get(id).unwrap().line.component_id, None);
    }

    #[test]
    fn test_non_dimension_edit_keeps_state() {
        let (mut draft, id) = draft_with_leg();
        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Ok(vec![]));

        let mut edited = draft.get(id).unwrap().line.clone();
        edited.note = Some("powder coated".to_string());
        edited.quantity = 2;
        assert!(!draft.update_line(id, edited).unwrap());
        assert_eq!(draft.state(id), Some(&AdvisoryState::Clear));
    }

    #[test]
    fn test_stale_result_discarded_after_edit() {
        let (mut draft, id) = draft_with_leg();
        let stale = draft.begin_check(id).unwrap().unwrap();

        let mut edited = alu_leg();
        edited.width = Some(45.0);
        draft.update_line(id, edited).unwrap();
        let fresh = draft.begin_check(id).unwrap().unwrap();

        assert_eq!(
            draft.apply_check_result(&stale, Ok(vec![found("C-1")])),
            CheckOutcome::Discarded
        );
        assert_eq!(draft.state(id), Some(&AdvisoryState::Checking));
        assert_eq!(draft.apply_check_result(&fresh, Ok(vec![])), CheckOutcome::Applied);
        assert_eq!(draft.state(id), Some(&AdvisoryState::Clear));
    }

    #[test]
    fn test_result_for_removed_line_discarded() {
        let (mut draft, id) = draft_with_leg();
        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.remove_line(id).unwrap();
        assert_eq!(draft.apply_check_result(&ticket, Ok(vec![])), CheckOutcome::Discarded);
        assert!(draft.is_empty());
    }

    #[test]
    fn test_failed_check_blocks_and_is_retried() {
        let (mut draft, id) = draft_with_leg();
        let ticket = draft.begin_check(id).unwrap().unwrap();
        draft.apply_check_result(&ticket, Err("timeout".to_string()));

        assert!(matches!(draft.state(id), Some(AdvisoryState::CheckFailed { .. })));
        assert_eq!(draft.lines_needing_check(), vec![id]);
        assert_eq!(draft.submission_gate(), Err(AdvisoryError::ChecksInFlight(vec![id])));
    }

    #[test]
    fn test_single_in_flight_submission() {
        let mut draft = DraftBom::new(10.0);
        let first = draft.begin_submission().unwrap();
        assert_eq!(draft.begin_submission(), Err(AdvisoryError::SubmissionInFlight));
        assert!(draft.finish_submission(first));
        assert!(!draft.finish_submission(first));

        let second = draft.begin_submission().unwrap();
        draft.abort_submission(second);
        assert!(draft.begin_submission().is_ok());
    }
}
