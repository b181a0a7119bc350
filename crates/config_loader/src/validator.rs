//! 配置校验模块
//!
//! 校验规则：
//! - 至少两个输入流 (一个主时钟流 + 至少一个从属流)
//! - 传感器类型唯一
//! - capacity > 0
//! - rate_hz > 0 且有限
//! - 统计窗口上限非负

use std::collections::HashSet;

use contracts::{ContractError, FusionBlueprint};
use validator::Validate;

/// 校验 FusionBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    validate_stream_count(blueprint)?;
    validate_sensor_types(blueprint)?;
    validate_stream_limits(blueprint)?;
    validate_statistics(blueprint)?;
    Ok(())
}

/// 校验输入流数量
fn validate_stream_count(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    if blueprint.streams.len() < 2 {
        return Err(ContractError::config_validation(
            "streams",
            format!(
                "at least 2 streams required (primary + secondary), got {}",
                blueprint.streams.len()
            ),
        ));
    }
    Ok(())
}

/// 校验传感器类型唯一性
fn validate_sensor_types(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, stream) in blueprint.streams.iter().enumerate() {
        if !seen.insert(stream.sensor_type) {
            return Err(ContractError::config_validation(
                format!("streams[{idx}].sensor_type"),
                format!("duplicate sensor_type '{}'", stream.sensor_type),
            ));
        }
    }
    Ok(())
}

/// 校验容量与采样率
fn validate_stream_limits(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    for (idx, stream) in blueprint.streams.iter().enumerate() {
        if stream.capacity == 0 {
            return Err(ContractError::config_validation(
                format!("streams[{idx}].capacity"),
                "capacity must be > 0",
            ));
        }
        if !(stream.rate_hz.is_finite() && stream.rate_hz > 0.0) {
            return Err(ContractError::config_validation(
                format!("streams[{idx}].rate_hz"),
                format!("rate_hz must be > 0, got {}", stream.rate_hz),
            ));
        }
    }
    Ok(())
}

/// 校验统计窗口配置
fn validate_statistics(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    let Err(errors) = blueprint.statistics.validate() else {
        return Ok(());
    };

    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    let (field, detail) = match fields.first() {
        Some((field, errs)) => (
            field.to_string(),
            errs.first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid value".to_string()),
        ),
        None => ("statistics".to_string(), errors.to_string()),
    };

    Err(ContractError::config_validation(
        format!("statistics.{field}"),
        detail,
    ))
}
