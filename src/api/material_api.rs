// ==========================================
// 家具 BOM 成本核算 - 原材料 API
// ==========================================
// 职责: 原材料库查询与维护（单价来源）
// ==========================================

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::profile::RawMaterial;
use crate::repository::MaterialRepository;

pub struct MaterialApi {
    material_repo: Arc<MaterialRepository>,
}

impl MaterialApi {
    pub fn new(material_repo: Arc<MaterialRepository>) -> Self {
        Self { material_repo }
    }

    /// 查询原材料
    ///
    /// # 参数
    /// - keyword: 编号或名称模糊匹配
    /// - category: 分类（WOOD / ALUMINUM / FABRIC ...）
    /// - include_inactive: 是否包含停用记录
    pub fn search(
        &self,
        keyword: Option<&str>,
        category: Option<&str>,
        include_inactive: bool,
    ) -> ApiResult<Vec<RawMaterial>> {
        let materials = self
            .material_repo
            .search(keyword, category, !include_inactive)?;
        debug!(count = materials.len(), "原材料查询");
        Ok(materials)
    }

    pub fn get(&self, material_id: &str) -> ApiResult<RawMaterial> {
        self.material_repo
            .find_by_id(material_id)?
            .ok_or_else(|| ApiError::NotFound(format!("原材料 {} 不存在", material_id)))
    }

    /// 新增或更新原材料
    pub fn upsert(&self, material: &RawMaterial) -> ApiResult<()> {
        if material.material_id.trim().is_empty() {
            return Err(ApiError::ValidationFailure("原材料编号不能为空".to_string()));
        }
        if material.unit_cost < Decimal::ZERO {
            return Err(ApiError::InvalidCost {
                field: "unit_cost".to_string(),
                value: material.unit_cost.to_string(),
            });
        }
        self.material_repo.upsert(material)?;
        info!(material_id = %material.material_id, unit_cost = %material.unit_cost, unit = %material.unit, "原材料已保存");
        Ok(())
    }

    /// 停用原材料（停用后不再参与计价）
    pub fn deactivate(&self, material_id: &str) -> ApiResult<()> {
        let mut material = self.get(material_id)?;
        material.active = false;
        self.material_repo.upsert(&material)?;
        info!(material_id, "原材料已停用");
        Ok(())
    }
}
