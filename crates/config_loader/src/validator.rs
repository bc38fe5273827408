//! 配置校验模块
//!
//! 校验规则：
//! - 声明式字段规则 (validator derive)：fov >= 1、频率 >= 0、话题非空
//! - 频率与距离为有限值
//! - 整帧字节数不溢出
//! - 采样窗口能放进相机图像
//! - sink 名称唯一且非空，队列容量 > 0

use std::collections::HashSet;

use contracts::{ContractError, SamplingWindow, SceneConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 SceneConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(scene: &SceneConfig) -> Result<(), ContractError> {
    validate_fields(scene)?;
    validate_rates(scene)?;
    validate_geometry(scene)?;
    validate_window(scene)?;
    validate_sinks(scene)?;
    Ok(())
}

/// 执行 derive 生成的字段规则
fn validate_fields(scene: &SceneConfig) -> Result<(), ContractError> {
    scene.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| (String::from("config"), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 按字段路径排序后取第一个错误，保证报错稳定
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(err) = field_errors.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// 校验频率与距离为有限值
fn validate_rates(scene: &SceneConfig) -> Result<(), ContractError> {
    let checks = [
        ("sensor.update_rate", scene.sensor.update_rate),
        ("plugin.update_rate", scene.plugin.update_rate),
        ("plugin.range", scene.plugin.range),
    ];
    for (field, value) in checks {
        if !value.is_finite() {
            return Err(ContractError::config_validation(
                field,
                format!("must be a finite number, got {value}"),
            ));
        }
    }
    Ok(())
}

/// 校验图像尺寸，行字节数和整帧字节数都不能溢出
fn validate_geometry(scene: &SceneConfig) -> Result<(), ContractError> {
    let geometry = scene.geometry();
    if geometry.checked_frame_len().is_none() {
        return Err(ContractError::config_validation(
            "sensor.image",
            format!(
                "{}x{} {} frame size overflows",
                geometry.width, geometry.height, geometry.format
            ),
        ));
    }
    Ok(())
}

/// 校验采样窗口
fn validate_window(scene: &SceneConfig) -> Result<(), ContractError> {
    let plugin = &scene.plugin;
    let geometry = scene.geometry();

    if plugin.fov > geometry.width || plugin.fov > geometry.height {
        return Err(ContractError::config_validation(
            "plugin.fov",
            format!(
                "fov ({}) must not exceed image size {}x{}",
                plugin.fov, geometry.width, geometry.height
            ),
        ));
    }

    SamplingWindow::locate(
        plugin.fov,
        plugin.window_origin,
        geometry.width,
        geometry.height,
        geometry.frame_len(),
    )
    .map_err(|e| match e {
        ContractError::ConfigValidation { message, .. } => {
            ContractError::config_validation("plugin.fov", message)
        }
        other => other,
    })?;

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(scene: &SceneConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in scene.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", idx),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
