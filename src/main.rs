use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use video_analyzer::{
    AnalyzeResponse, ApiServer, ClipRange, Config, FalClient, GeminiClient, GenerateRequest,
    PromptStyle, Resolution, SourceFetcher, VideoAnalyzer, VideoGenerator, VideoSource,
};

#[derive(Parser)]
#[command(name = "video-analyzer")]
#[command(version, author = "TigreRoll")]
#[command(about = "Gemini video analysis and fal.ai video generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to video-analyzer.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyze a local file, a YouTube URL, or any other video URL
    Analyze {
        /// Path or URL of the video
        input: String,
        /// Custom analysis prompt
        #[arg(long)]
        prompt: Option<String>,
        /// Gemini model
        #[arg(long)]
        model: Option<String>,
        /// Clip start, YouTube only (e.g. "1m30s")
        #[arg(long)]
        start_offset: Option<String>,
        /// Clip end, YouTube only
        #[arg(long)]
        end_offset: Option<String>,
        /// Where to save the result JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a video from reference images
    Generate {
        /// Reference image URL (repeatable)
        #[arg(long = "image-url", required = true)]
        image_urls: Vec<String>,
        /// Animation prompt
        #[arg(long)]
        prompt: String,
        /// 720p or 1080p
        #[arg(long, default_value = "720p")]
        resolution: Resolution,
        /// Override the configured audio default
        #[arg(long)]
        generate_audio: Option<bool>,
        /// Save the full fal.ai result JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())?,
        None => Config::load()?,
    };

    let level = if cli.verbose { "debug" } else { config.output.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("video_analyzer={},tower_http={},warn", level, level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate()?;

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await,
        Commands::Analyze {
            input,
            prompt,
            model,
            start_offset,
            end_offset,
            output,
        } => {
            let clip = ClipRange::new(start_offset, end_offset);
            analyze(config, &input, clip, prompt, model, output).await
        }
        Commands::Generate {
            image_urls,
            prompt,
            resolution,
            generate_audio,
            output,
        } => {
            let request = GenerateRequest {
                image_urls,
                prompt,
                resolution,
                generate_audio,
                ..Default::default()
            };
            generate(config, request, output).await
        }
    }
}

fn build_analyzer(config: &Config, default_prompt: String) -> Result<VideoAnalyzer> {
    let gemini = GeminiClient::new(&config.gemini)?;
    let fetcher = SourceFetcher::new(&config.download)?;

    Ok(VideoAnalyzer::new(
        Arc::new(gemini),
        Arc::new(fetcher),
        config.gemini.default_model.clone(),
        default_prompt,
        config.gemini.inline_threshold_mb,
    ))
}

fn build_generator(config: &Config) -> Result<VideoGenerator> {
    let fal = FalClient::new(&config.fal)?;
    Ok(VideoGenerator::new(Arc::new(fal), config.fal.generate_audio_default))
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!("🚀 Video Analyzer starting...");
    info!("{}", config.summary());

    if config.gemini.api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set; /analyze requests will fail");
    }
    if config.fal.api_key.is_none() {
        warn!("FAL_KEY is not set; /generate requests will fail");
    }

    let default_prompt = config.analysis.load_default_prompt().await?;
    let analyzer = build_analyzer(&config, default_prompt)?;
    let generator = build_generator(&config)?;

    ApiServer::new(Arc::new(analyzer), Arc::new(generator), &config)
        .start()
        .await
}

async fn analyze(
    config: Config,
    input: &str,
    clip: ClipRange,
    prompt: Option<String>,
    model: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    // Local runs want the full breakdown unless a prompt file says otherwise
    let default_prompt = match config.analysis.prompt_file {
        Some(_) => config.analysis.load_default_prompt().await?,
        None => PromptStyle::Comprehensive.text().to_string(),
    };
    let analyzer = build_analyzer(&config, default_prompt)?;

    let source = VideoSource::from_cli_arg(input, clip);
    let start_time = std::time::Instant::now();
    let outcome = analyzer
        .analyze_source(source, prompt.as_deref(), model.as_deref())
        .await;
    let duration = start_time.elapsed();

    let response = match &outcome {
        Ok(analysis) => AnalyzeResponse::from(analysis.clone()),
        Err(failure) => AnalyzeResponse::from(failure),
    };

    let output = output.unwrap_or_else(|| config.output.results_file.clone());
    let json = serde_json::to_string_pretty(&response)?;
    tokio::fs::write(&output, json)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    match outcome {
        Ok(analysis) => {
            info!("🎉 Analysis completed in {:.2}s", duration.as_secs_f64());
            info!("🤖 Model: {}", analysis.model);
            if let Some(size) = analysis.video_size_mb {
                info!("📦 Video size: {:.2} MB", size);
            }
            println!("{}", analysis.text);
            info!("💾 Result saved to {}", output.display());
            Ok(())
        }
        Err(failure) => {
            error!("❌ {}", failure);
            Err(anyhow!(failure))
        }
    }
}

async fn generate(config: Config, request: GenerateRequest, output: Option<PathBuf>) -> Result<()> {
    let generator = build_generator(&config)?;

    let start_time = std::time::Instant::now();
    let video = generator
        .run(request)
        .await
        .map_err(|e| anyhow!(VideoGenerator::failure_message(&e)))?;

    info!("🎉 Generation completed in {:.2}s", start_time.elapsed().as_secs_f64());
    debug!("fal.ai result: {}", video.raw);
    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&video.raw)?;
        tokio::fs::write(&output, json)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("💾 Result saved to {}", output.display());
    }
    println!("{}", video.video_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_output_flag() {
        let cli = Cli::try_parse_from([
            "video-analyzer",
            "generate",
            "--image-url",
            "https://example.com/a.png",
            "--prompt",
            "pan left",
            "--output",
            "fal_result.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate { output, image_urls, .. } => {
                assert_eq!(output, Some(PathBuf::from("fal_result.json")));
                assert_eq!(image_urls, vec!["https://example.com/a.png".to_string()]);
            }
            _ => panic!("expected generate"),
        }
    }
}
