use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::caption::engine::{CaptionEngine, CaptionMode, CaptionResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionArgs {
    pub file_path: PathBuf,
    pub mode: Option<CaptionMode>,
    pub detailed: bool,
    pub output: Option<PathBuf>,
}

pub fn caption_usage() -> &'static str {
    "Usage: image_insight_service caption --file <path> [--mode local|cloud] [--no-detailed] [--output <path>]"
}

/// Returns `None` unless the first argument is the `caption` subcommand.
pub fn parse_caption_args(args: &[String]) -> Result<Option<CaptionArgs>> {
    if args.get(1).map(|value| value.as_str()) != Some("caption") {
        return Ok(None);
    }

    let mut file_path: Option<PathBuf> = None;
    let mut mode = None;
    let mut detailed = true;
    let mut output = None;

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--file" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --file"))?;
                file_path = Some(PathBuf::from(value));
            }
            "--mode" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --mode"))?;
                mode = Some(
                    value
                        .parse::<CaptionMode>()
                        .map_err(|err| anyhow!("Invalid --mode value: {err}"))?,
                );
            }
            "--detailed" => {
                detailed = true;
            }
            "--no-detailed" => {
                detailed = false;
            }
            "--output" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --output"))?;
                output = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                return Err(anyhow!(caption_usage()));
            }
            other => {
                return Err(anyhow!(
                    "Unknown caption argument: {other}\n{}",
                    caption_usage()
                ));
            }
        }
        index += 1;
    }

    let file_path = file_path.ok_or_else(|| anyhow!("--file is required"))?;

    Ok(Some(CaptionArgs {
        file_path,
        mode,
        detailed,
        output,
    }))
}

/// Captions one file and writes the JSON payload to `--output` or stdout.
pub async fn run_caption_once(
    engine: &CaptionEngine,
    args: &CaptionArgs,
    default_mode: CaptionMode,
) -> Result<CaptionResponse> {
    let bytes = tokio::fs::read(&args.file_path)
        .await
        .map_err(|err| anyhow!("Failed to read {}: {err}", args.file_path.display()))?;
    let mode = args.mode.unwrap_or(default_mode);
    info!(
        "Captioning {} ({} bytes, mode={}, detailed={})",
        args.file_path.display(),
        bytes.len(),
        mode,
        args.detailed
    );

    let response = engine.generate_caption(&bytes, mode, args.detailed).await;
    let json = serde_json::to_string_pretty(&response)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{json}\n"))
                .await
                .map_err(|err| anyhow!("Failed to write {}: {err}", path.display()))?;
            info!("Wrote caption to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::models::caption::{CaptionModel, GenerationRequest};
    use crate::models::lazy::{LazyModel, ModelLoader};
    use crate::models::media::{sample_png, PreparedImage};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    struct EchoModel;

    #[async_trait]
    impl CaptionModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, image: &PreparedImage, _request: &GenerationRequest) -> Result<String> {
            Ok(format!("a {}x{} red square", image.width, image.height))
        }
    }

    struct EchoLoader;

    #[async_trait]
    impl ModelLoader for EchoLoader {
        fn label(&self) -> &str {
            "echo"
        }

        async fn load(&self) -> Result<Arc<dyn CaptionModel>> {
            Ok(Arc::new(EchoModel))
        }
    }

    #[test]
    fn ignores_other_invocations() {
        assert!(parse_caption_args(&args(&["bin"])).unwrap().is_none());
        assert!(parse_caption_args(&args(&["bin", "serve"])).unwrap().is_none());
    }

    #[test]
    fn parses_all_flags() {
        let parsed = parse_caption_args(&args(&[
            "bin",
            "caption",
            "--file",
            "beach.jpg",
            "--mode",
            "cloud",
            "--no-detailed",
            "--output",
            "out.json",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            parsed,
            CaptionArgs {
                file_path: PathBuf::from("beach.jpg"),
                mode: Some(CaptionMode::Cloud),
                detailed: false,
                output: Some(PathBuf::from("out.json")),
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_caption_args(&args(&["bin", "caption"])).is_err());
        assert!(parse_caption_args(&args(&["bin", "caption", "--file"])).is_err());
        assert!(parse_caption_args(&args(&["bin", "caption", "--file", "a.png", "--mode", "gpu"])).is_err());
        let err = parse_caption_args(&args(&["bin", "caption", "--verbose"])).unwrap_err();
        assert!(err.to_string().contains("Unknown caption argument: --verbose"));
    }

    #[tokio::test]
    async fn captions_file_and_writes_json() {
        let dir = std::env::temp_dir().join(format!("insight-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("square.png");
        let output = dir.join("caption.json");
        std::fs::write(&input, sample_png(3, 2)).unwrap();

        let engine = CaptionEngine::new(
            LazyModel::new(EchoLoader),
            LazyModel::new(EchoLoader),
            LazyModel::new(EchoLoader),
        );
        let caption_args = CaptionArgs {
            file_path: input,
            mode: None,
            detailed: false,
            output: Some(output.clone()),
        };

        let response = run_caption_once(&engine, &caption_args, CaptionMode::Local)
            .await
            .unwrap();
        assert_eq!(response.caption, "a 3x2 red square");

        let written: CaptionResponse =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, response);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let engine = CaptionEngine::new(
            LazyModel::new(EchoLoader),
            LazyModel::new(EchoLoader),
            LazyModel::new(EchoLoader),
        );
        let caption_args = CaptionArgs {
            file_path: PathBuf::from("/definitely/not/here.png"),
            mode: Some(CaptionMode::Cloud),
            detailed: true,
            output: None,
        };
        assert!(run_caption_once(&engine, &caption_args, CaptionMode::Local)
            .await
            .is_err());
    }
}
