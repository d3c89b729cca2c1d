//! 配置校验模块
//!
//! 校验规则：
//! - device.host 非空
//! - 至少启用一个流，端口非零且互不相同
//! - 各超时、重连间隔、载荷上限 > 0
//! - 启用深度流时标定必须存在、16 个有限值且可逆
//! - sink 名称非空且唯一

use std::collections::HashSet;

use contracts::{ContractError, Modality, StreamerConfig};
use pose_engine::CalibrationExtrinsics;

/// 校验 StreamerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &StreamerConfig) -> Result<(), ContractError> {
    validate_device(config)?;
    validate_streams(config)?;
    validate_connection(config)?;
    validate_calibration(config)?;
    validate_sinks(config)?;
    Ok(())
}

fn validate_device(config: &StreamerConfig) -> Result<(), ContractError> {
    if config.device.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "device.host",
            "host cannot be empty",
        ));
    }
    Ok(())
}

/// 校验流端口
fn validate_streams(config: &StreamerConfig) -> Result<(), ContractError> {
    let endpoints = config.streams.enabled_endpoints();
    if endpoints.is_empty() {
        return Err(ContractError::config_validation(
            "streams",
            "at least one stream must be enabled",
        ));
    }

    let mut seen = HashSet::new();
    for endpoint in &endpoints {
        let field = format!("streams.{}.port", endpoint.modality);
        if endpoint.port == 0 {
            return Err(ContractError::config_validation(field, "port must be > 0"));
        }
        if !seen.insert(endpoint.port) {
            return Err(ContractError::config_validation(
                field,
                format!("duplicate port {}", endpoint.port),
            ));
        }
    }
    Ok(())
}

/// 校验连接参数
fn validate_connection(config: &StreamerConfig) -> Result<(), ContractError> {
    let connection = &config.connection;
    let fields = [
        ("connection.connect_timeout_ms", connection.connect_timeout_ms),
        ("connection.read_timeout_ms", connection.read_timeout_ms),
        ("connection.reconnect_delay_ms", connection.reconnect_delay_ms),
        ("connection.max_payload_bytes", connection.max_payload_bytes),
    ];
    for (field, value) in fields {
        if value == 0 {
            return Err(ContractError::config_validation(field, "must be > 0"));
        }
    }
    Ok(())
}

/// 深度流需要外参；颜色流忽略标定
fn validate_calibration(config: &StreamerConfig) -> Result<(), ContractError> {
    if !config.streams.get(Modality::Depth).enabled {
        return Ok(());
    }
    let calibration = config.calibration.as_ref().ok_or_else(|| {
        ContractError::config_validation(
            "calibration.rig_to_depth",
            "required when the depth stream is enabled",
        )
    })?;
    CalibrationExtrinsics::from_config(calibration)?;
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(config: &StreamerConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}
