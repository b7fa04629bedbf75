use crate::handlers::extract::ApiJson;
use crate::middleware::{ApiResult, IntoApiResponse};
use crate::services::calculator::{estimate, CalculatorInput, Estimate};

/// POST /calculator - commission and profit estimate for arbitrary terms
pub async fn calculate(ApiJson(input): ApiJson<CalculatorInput>) -> ApiResult<Estimate> {
    Ok(estimate(input)?.into_api_response())
}
