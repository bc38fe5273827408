//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, SceneConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SceneConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SceneConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SceneConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PixelFormat, SinkType, WindowOrigin};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[sensor]
name = "light_cam"
[sensor.image]
width = 64
height = 48
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let scene = result.unwrap();
        assert_eq!(scene.sensor.name, "light_cam");
        assert_eq!(scene.sensor.update_rate, 30.0);
        assert_eq!(scene.sensor.image.format, PixelFormat::L8);
        assert_eq!(scene.plugin.fov, 6);
        assert_eq!(scene.plugin.topic_name, "lightSensor");
        assert!(scene.sinks.is_empty());
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[sensor]
name = "light_cam"
update_rate = 20.0
[sensor.image]
width = 320
height = 240
format = "R8G8B8"

[plugin]
robot_namespace = "robot1"
topic_name = "lux"
fov = 10
update_rate = 5.0
window_origin = "centered"

[[sinks]]
name = "console"
sink_type = "log"

[[sinks]]
name = "jsonl"
sink_type = "file"
queue_capacity = 8
[sinks.params]
path = "out/readings.jsonl"
"#;
        let scene = parse_toml(content).unwrap();
        assert_eq!(scene.sensor.image.format, PixelFormat::Rgb8);
        assert_eq!(scene.plugin.robot_namespace, "robot1");
        assert_eq!(scene.plugin.fov, 10);
        assert_eq!(scene.plugin.window_origin, WindowOrigin::Centered);
        assert_eq!(scene.sinks.len(), 2);
        assert_eq!(scene.sinks[0].queue_capacity, 100);
        assert_eq!(scene.sinks[1].sink_type, SinkType::File);
        assert_eq!(
            scene.sinks[1].params.get("path").map(String::as_str),
            Some("out/readings.jsonl")
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "sensor": { "name": "cam", "image": { "width": 16, "height": 16, "format": "L_INT8" } },
            "plugin": { "fov": 4 },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().plugin.fov, 4);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_format_tag() {
        let content = r#"
[sensor]
name = "cam"
[sensor.image]
width = 8
height = 8
format = "YUV422"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
