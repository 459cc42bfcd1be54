use std::path::Path;
use std::process::Command;

use tw_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with pod_id={} work_dir={}",
        config.pod_id, config.work_dir
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_ffmpeg(&config.ffmpeg_bin)?;
    ensure_url("TR_CONTROLLER_URL", &config.controller.base_url)?;
    ensure_url("VIDEO_SERVER_URL", &config.video_server.base_url)?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {}", path.display(), e))?;
    Ok(())
}

fn ensure_ffmpeg(binary: &str) -> anyhow::Result<()> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", binary, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            binary,
            output.status
        ));
    }
    Ok(())
}

fn ensure_url(var: &str, value: &str) -> anyhow::Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL ({}): {}", var, value, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow::anyhow!("{} must be http(s), got {}", var, url.scheme()));
    }
    Ok(())
}
