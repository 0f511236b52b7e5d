use wasm_bindgen::prelude::*;

use crate::config::TerrainConfig;
use crate::dataset;
use crate::error::PipelineError;
use crate::scene::TerrainScene;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn parse_config(config_json: Option<String>) -> Result<TerrainConfig, JsValue> {
    match config_json {
        Some(json) if !json.trim().is_empty() => TerrainConfig::from_json_str(&json)
            .map_err(|e| JsValue::from_str(&e.to_string())),
        _ => Ok(TerrainConfig::default()),
    }
}

fn to_json(scene: &TerrainScene) -> Result<String, JsValue> {
    serde_json::to_string(scene).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Build the terrain scene from CSV text and return it as a JSON string.
///
/// CSV that cannot be parsed, or that holds no usable film, is replaced by the
/// built-in films; the host sees a warning in the console but still gets a scene.
#[wasm_bindgen]
pub fn build_scene_json(csv_text: &str, config_json: Option<String>) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;

    let raw = match dataset::parse_csv(csv_text) {
        Ok(records) if !records.is_empty() => records,
        Ok(_) => {
            log::warn!("CSV has no data rows, using built-in films");
            dataset::fallback_records()
        }
        Err(e) => {
            log::warn!("CSV parse failed ({}), using built-in films", e);
            dataset::fallback_records()
        }
    };

    let scene = match TerrainScene::build(&raw, &config) {
        Ok(scene) => scene,
        Err(PipelineError::EmptyDataset { total }) => {
            log::warn!("No usable records among {} rows, using built-in films", total);
            TerrainScene::build(&dataset::fallback_records(), &config)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        Err(err @ PipelineError::TimeSpanTooLarge { .. }) => {
            log::warn!("{}, using built-in films", err);
            TerrainScene::build(&dataset::fallback_records(), &config)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        Err(e) => return Err(JsValue::from_str(&e.to_string())),
    };

    to_json(&scene)
}

/// Scene for the built-in films only.
#[wasm_bindgen]
pub fn fallback_scene_json(config_json: Option<String>) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    let scene = TerrainScene::build(&dataset::fallback_records(), &config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_json(&scene)
}
