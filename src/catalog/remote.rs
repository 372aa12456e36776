// ==========================================
// 家具 BOM 成本核算 - 远程目录服务
// ==========================================
// 协议: 单一 HTTP 端点
//   - 读操作: GET  {endpoint}?action=<名称>&参数...
//   - 写操作: POST {endpoint}  body = {"action": <名称>, ...}
// 响应: {"success": bool, "error": string, "data": ...}
// 任何传输/解析失败统一映射为 GatewayError::Network（可重试）
// ==========================================

use crate::catalog::dto::{
    BomReceipt, BomSubmission, UnitRate, WireCostVersion, WireEnvelope, WireMatch, WireReceipt,
    WireUnitCost,
};
use crate::catalog::{CatalogGateway, GatewayError, GatewayResult};
use crate::domain::component::SimilarMatch;
use crate::domain::cost::CostVersion;
use crate::domain::types::{ComplexityLevel, MaterialUnit, SubComponent};
use crate::engine::similarity::{rank_matches, SimilarityQuery};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct RemoteCatalog {
    client: Client,
    endpoint: String,
}

impl RemoteCatalog {
    /// 创建远程目录客户端
    ///
    /// # 参数
    /// - endpoint: 服务地址
    /// - timeout_secs: 单次请求超时
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(format!("HTTP 客户端初始化失败: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get<T: DeserializeOwned>(&self, action: &str, query: &[(&str, String)]) -> GatewayResult<T> {
        debug!(action, "GET 远程目录");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", action)])
            .query(query)
            .send()
            .await
            .map_err(|e| network_error(action, e))?;
        read_envelope(action, response).await
    }

    async fn post<T: DeserializeOwned>(&self, action: &str, body: serde_json::Value) -> GatewayResult<T> {
        debug!(action, "POST 远程目录");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(action, e))?;
        read_envelope(action, response).await
    }
}

fn network_error(action: &str, err: reqwest::Error) -> GatewayError {
    warn!(action, error = %err, "远程目录请求失败");
    GatewayError::Network(format!("{}: {}", action, err))
}

/// 解析统一响应外壳
///
/// success=false 或缺少 data 均视为失败
async fn read_envelope<T: DeserializeOwned>(
    action: &str,
    response: reqwest::Response,
) -> GatewayResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(action, %status, "远程目录返回错误状态");
        return Err(GatewayError::Network(format!("{} 返回 {}: {}", action, status, body)));
    }

    let envelope: WireEnvelope<T> = response
        .json()
        .await
        .map_err(|e| network_error(action, e))?;
    unwrap_envelope(action, envelope)
}

fn unwrap_envelope<T>(action: &str, envelope: WireEnvelope<T>) -> GatewayResult<T> {
    if envelope.success == Some(false) {
        let reason = envelope.error.unwrap_or_else(|| "未知错误".to_string());
        return Err(GatewayError::Network(format!("{}: {}", action, reason)));
    }
    envelope
        .data
        .ok_or_else(|| GatewayError::Network(format!("{}: 响应缺少 data", action)))
}

/// 单价或单位缺失、无法表示、为负时视为未找到，不以 0 计价
fn unit_rate_from_wire(
    sub_component: SubComponent,
    key: &str,
    wire: WireUnitCost,
) -> GatewayResult<UnitRate> {
    let not_found = || GatewayError::UnitCostNotFound {
        sub_component,
        key: key.to_string(),
    };
    let unit = wire
        .unit
        .as_deref()
        .and_then(MaterialUnit::parse)
        .ok_or_else(not_found)?;
    let rate = wire
        .unit_cost
        .filter(|v| v.is_finite() && *v >= 0.0)
        .and_then(Decimal::from_f64)
        .ok_or_else(not_found)?;
    Ok(UnitRate::new(rate, unit))
}

/// 丢弃无组件编号的命中（无法被复用），其余按本地规则重新排序
fn matches_from_wire(query: &SimilarityQuery, wire: Vec<WireMatch>) -> Vec<SimilarMatch> {
    let matches: Vec<SimilarMatch> = wire
        .into_iter()
        .map(|m| m.into_match(query.sub_component))
        .filter(|m| {
            let keep = !m.component_id.trim().is_empty();
            if !keep {
                warn!("远程命中缺少组件编号，已忽略");
            }
            keep
        })
        .collect();
    rank_matches(query, matches)
}

#[async_trait]
impl CatalogGateway for RemoteCatalog {
    async fn resolve_unit_cost(
        &self,
        sub_component: SubComponent,
        key: &str,
    ) -> GatewayResult<UnitRate> {
        let wire: WireUnitCost = self
            .get(
                "getUnitCost",
                &[
                    ("subComponent", sub_component.as_str().to_string()),
                    ("key", key.to_string()),
                ],
            )
            .await?;

        unit_rate_from_wire(sub_component, key, wire)
    }

    #[instrument(skip(self), level = "debug")]
    async fn search_similar_components(
        &self,
        query: &SimilarityQuery,
    ) -> GatewayResult<Vec<SimilarMatch>> {
        let mut params = vec![
            ("subComponent", query.sub_component.as_str().to_string()),
            ("length", query.length.to_string()),
            ("width", query.width.to_string()),
            ("tolerance", query.tolerance_pct.to_string()),
        ];
        if let Some(thickness) = query.thickness {
            params.push(("thickness", thickness.to_string()));
        }

        let wire: Vec<WireMatch> = self.get("searchSimilarComponents", &params).await?;
        Ok(matches_from_wire(query, wire))
    }

    #[instrument(skip_all, fields(product = %submission.metadata.name))]
    async fn submit_bom(&self, submission: &BomSubmission) -> GatewayResult<BomReceipt> {
        let wire: WireReceipt = self
            .post("submitBOM", json!({ "action": "submitBOM", "payload": submission }))
            .await?;
        Ok(BomReceipt::from(wire))
    }

    async fn recalculate_cost(
        &self,
        product_code: &str,
        level: ComplexityLevel,
        changed_by: &str,
    ) -> GatewayResult<CostVersion> {
        let wire: WireCostVersion = self
            .post(
                "recalculateCost",
                json!({
                    "action": "recalculateCost",
                    "productCode": product_code,
                    "complexity": level.level(),
                    "changedBy": changed_by,
                }),
            )
            .await?;
        Ok(wire.into_version(product_code))
    }

    async fn get_cost_versions(&self, product_code: &str) -> GatewayResult<Vec<CostVersion>> {
        let wire: Vec<WireCostVersion> = self
            .get("getCostVersions", &[("productCode", product_code.to_string())])
            .await?;
        Ok(wire
            .into_iter()
            .map(|v| v.into_version(product_code))
            .collect())
    }
}
