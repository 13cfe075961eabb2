use serde::{Deserialize, Serialize};

use crate::error::{PlotError, PlotResult};

use super::{AxisTicksResponse, LabelsResponse};

pub const AXIS_TICKS_JSON_SCHEMA_V1: u32 = 1;
pub const LABELS_JSON_SCHEMA_V1: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTicksJsonContractV1 {
    pub schema_version: u32,
    pub response: AxisTicksResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsJsonContractV1 {
    pub schema_version: u32,
    pub response: LabelsResponse,
}

impl AxisTicksResponse {
    pub fn to_json_contract_v1_pretty(&self) -> PlotResult<String> {
        let payload = AxisTicksJsonContractV1 {
            schema_version: AXIS_TICKS_JSON_SCHEMA_V1,
            response: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            PlotError::InvalidData(format!("failed to serialize axis ticks contract v1: {e}"))
        })
    }

    /// Accepts either a bare response or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> PlotResult<Self> {
        if let Ok(response) = serde_json::from_str::<AxisTicksResponse>(input) {
            return Ok(response);
        }
        let payload: AxisTicksJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            PlotError::InvalidData(format!("failed to parse axis ticks json payload: {e}"))
        })?;
        if payload.schema_version != AXIS_TICKS_JSON_SCHEMA_V1 {
            return Err(PlotError::InvalidData(format!(
                "unsupported axis ticks schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.response)
    }
}

impl LabelsResponse {
    pub fn to_json_contract_v1_pretty(&self) -> PlotResult<String> {
        let payload = LabelsJsonContractV1 {
            schema_version: LABELS_JSON_SCHEMA_V1,
            response: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            PlotError::InvalidData(format!("failed to serialize labels contract v1: {e}"))
        })
    }

    pub fn from_json_compat_str(input: &str) -> PlotResult<Self> {
        if let Ok(response) = serde_json::from_str::<LabelsResponse>(input) {
            return Ok(response);
        }
        let payload: LabelsJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            PlotError::InvalidData(format!("failed to parse labels json payload: {e}"))
        })?;
        if payload.schema_version != LABELS_JSON_SCHEMA_V1 {
            return Err(PlotError::InvalidData(format!(
                "unsupported labels schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.response)
    }
}
