// ==========================================
// 家具 BOM 成本核算 - 产品 API
// ==========================================
// 职责: 产品列表（编码/名称/类型/主材/当前成本/状态）
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::product::{Product, ProductListing};
use crate::repository::ProductRepository;

pub struct ProductApi {
    product_repo: Arc<ProductRepository>,
}

impl ProductApi {
    pub fn new(product_repo: Arc<ProductRepository>) -> Self {
        Self { product_repo }
    }

    /// 全部产品，附当前成本版本的材料成本、出厂价与售价
    pub fn list(&self) -> ApiResult<Vec<ProductListing>> {
        Ok(self.product_repo.list_with_latest_cost()?)
    }

    /// 单个产品（含有序组件行）
    pub fn get(&self, code: &str) -> ApiResult<Product> {
        self.product_repo
            .find_by_code(code)?
            .ok_or_else(|| ApiError::ProductNotFound(code.to_string()))
    }
}
