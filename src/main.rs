//! # Aurora AI — 命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与子命令分发。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::time::Duration;

use aurora_ai::compositing::{self, DecodeLimits, RgbColor};
use aurora_ai::error::AppError;
use aurora_ai::processing::{
    BackgroundQuality, EnhanceScale, ImageFile, ProcessingConfig, ProcessingMode, ProcessingService, ProviderHint,
};
use aurora_ai::proxy::{self, ProxyConfig};
use aurora_ai::session::{EditorSession, NotificationKind, Tool};
use aurora_ai::settings::{EditorPreferences, JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aurora", version)]
#[command(about = "AI image editing client: background removal, upscaling, compositing")]
struct Cli {
    /// Editor preferences file (provider, quality, compare background)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send an image to the processing backend and save the result
    Process {
        input: PathBuf,

        /// remove_background | enhance_2x | enhance_4x | advanced_2x | advanced_4x
        #[arg(
            long,
            value_parser = ProcessingMode::from_str,
            default_value = "remove_background",
            conflicts_with_all = ["background", "prompt"]
        )]
        mode: ProcessingMode,

        /// Replace the removed background with this image
        #[arg(long, conflicts_with = "prompt")]
        background: Option<PathBuf>,

        /// Generate a new background from this description
        #[arg(long)]
        prompt: Option<String>,

        /// fast | hq (defaults to the saved preference)
        #[arg(long, value_parser = BackgroundQuality::from_str)]
        quality: Option<BackgroundQuality>,

        /// auto | openvino | lcm (defaults to the saved preference)
        #[arg(long, value_parser = ProviderHint::from_str)]
        provider: Option<ProviderHint>,

        /// Override the per-mode timeout
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,

        /// Processing endpoint base URL (overrides AURORA_API_URL)
        #[arg(long)]
        api_url: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Composite a transparent foreground over a background locally
    Composite {
        foreground: PathBuf,
        background: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build same-size before/after comparison frames
    Compare {
        before: PathBuf,
        after: PathBuf,
        #[arg(long)]
        before_out: PathBuf,
        #[arg(long)]
        after_out: PathBuf,
        /// Canvas color, e.g. #181b23 (defaults to the saved preference)
        #[arg(long)]
        background: Option<String>,
    },
    /// Report whether an image contains transparent pixels
    Transparency { input: PathBuf },
    /// Run the same-origin /api reverse proxy
    Serve {
        /// Backend origin (overrides BACKEND_URL)
        #[arg(long)]
        backend: Option<String>,
        /// Listen address (overrides AURORA_PROXY_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Update saved editor preferences
    Prefs {
        #[arg(long, value_parser = ProviderHint::from_str)]
        provider: Option<ProviderHint>,
        #[arg(long, value_parser = BackgroundQuality::from_str)]
        quality: Option<BackgroundQuality>,
        #[arg(long)]
        compare_background: Option<String>,
    },
}

fn preference_store(path: Option<&Path>) -> Box<dyn PreferenceStore> {
    match path {
        Some(path) => Box::new(JsonFilePreferenceStore::new(path)),
        None => Box::new(MemoryPreferenceStore::default()),
    }
}

fn default_output(input: &Path, session: &EditorSession) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(session.suggested_download_name())
}

async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(format!("后台任务异常: {e}"))))?
}

#[allow(clippy::too_many_arguments)]
async fn run_process(
    preferences: EditorPreferences,
    input: PathBuf,
    mode: ProcessingMode,
    background: Option<PathBuf>,
    prompt: Option<String>,
    quality: Option<BackgroundQuality>,
    provider: Option<ProviderHint>,
    timeout_secs: Option<u64>,
    api_url: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), AppError> {
    let mut config = ProcessingConfig::from_env();
    if let Some(url) = api_url {
        config.base_url = url;
    }
    let max_upload = config.max_upload_bytes;

    let service =
        ProcessingService::with_provider_hint(config, provider.unwrap_or(preferences.provider_hint))?;

    let tool = match (background, prompt) {
        (Some(path), _) => Tool::ReplaceBackground {
            background: ImageFile::from_path(path, max_upload)?,
        },
        (None, Some(prompt)) => Tool::GenerateBackground {
            prompt,
            quality: quality.unwrap_or(preferences.background_quality),
        },
        (None, None) => match mode {
            ProcessingMode::RemoveBackground => Tool::RemoveBackground,
            other => Tool::Enhance {
                scale: if other.is_4x() { EnhanceScale::X4 } else { EnhanceScale::X2 },
                advanced: matches!(other, ProcessingMode::Advanced2x | ProcessingMode::Advanced4x),
            },
        },
    };

    let mut session = EditorSession::new();
    session.upload(ImageFile::from_path(&input, max_upload)?);

    let (ticket, source) = session.begin_processing(&tool)?;
    let mut request = tool.to_request(source);
    if let Some(secs) = timeout_secs {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    let result = service
        .process(request, |notice| log::info!("📣 后端提示：{notice}"))
        .await;
    session.complete(ticket, result);

    let mut failed = false;
    for notification in session.drain_notifications() {
        match notification.kind {
            NotificationKind::Error => {
                failed = true;
                eprintln!("error: {}", notification.message);
            }
            _ => println!("{}", notification.message),
        }
    }
    if failed {
        std::process::exit(1);
    }

    let output = output.unwrap_or_else(|| default_output(&input, &session));
    session.save_current(&output).await?;
    println!("Saved {}", output.display());
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let store = preference_store(cli.settings.as_deref());
    let preferences = store.load()?;

    match cli.command {
        Command::Process {
            input,
            mode,
            background,
            prompt,
            quality,
            provider,
            timeout_secs,
            api_url,
            output,
        } => {
            run_process(
                preferences,
                input,
                mode,
                background,
                prompt,
                quality,
                provider,
                timeout_secs,
                api_url,
                output,
            )
            .await?;
        }
        Command::Composite {
            foreground,
            background,
            output,
        } => {
            let fg = tokio::fs::read(&foreground).await?;
            let bg = tokio::fs::read(&background).await?;
            let png = blocking(move || Ok(compositing::composite_png(&fg, &bg, DecodeLimits::default())?)).await?;
            tokio::fs::write(&output, png).await?;
            println!("Saved {}", output.display());
        }
        Command::Compare {
            before,
            after,
            before_out,
            after_out,
            background,
        } => {
            let color = match background {
                Some(hex) => RgbColor::from_hex(&hex)?,
                None => preferences.compare_background,
            };
            let before_bytes = tokio::fs::read(&before).await?;
            let after_bytes = tokio::fs::read(&after).await?;

            let (first, second) = blocking(move || {
                let limits = DecodeLimits::default();
                let before = compositing::decode_image(&before_bytes, limits)?;
                let after = compositing::decode_image(&after_bytes, limits)?;
                let frame = compositing::prepare_images_for_comparison(&before, &after, color)?;
                Ok(frame.to_png_pair()?)
            })
            .await?;

            tokio::fs::write(&before_out, first).await?;
            tokio::fs::write(&after_out, second).await?;
            println!("Saved {} and {}", before_out.display(), after_out.display());
        }
        Command::Transparency { input } => {
            let bytes = tokio::fs::read(&input).await?;
            let transparent = blocking(move || Ok(compositing::has_transparency_bytes(&bytes))).await?;
            println!("{}", if transparent { "transparent" } else { "opaque" });
        }
        Command::Serve { backend, addr } => {
            let mut config = ProxyConfig::from_env()?;
            if let Some(backend) = backend {
                config.backend_url = backend;
            }
            if let Some(addr) = addr {
                config.listen_addr = addr.parse().map_err(|_| {
                    proxy::ProxyError::InvalidConfig(format!("不是合法的监听地址: {addr}"))
                })?;
            }
            proxy::serve(config).await?;
        }
        Command::Prefs {
            provider,
            quality,
            compare_background,
        } => {
            let mut updated = preferences;
            if let Some(provider) = provider {
                updated.provider_hint = provider;
            }
            if let Some(quality) = quality {
                updated.background_quality = quality;
            }
            if let Some(hex) = compare_background {
                updated.compare_background = RgbColor::from_hex(&hex)?;
            }
            store.save(&updated)?;
            println!(
                "provider={} quality={} compare_background={}",
                updated.provider_hint.as_str(),
                updated.background_quality.as_str(),
                updated.compare_background.to_hex()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("❌ [{}] {err}", err.code());
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
