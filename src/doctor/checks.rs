use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;

use crate::audio::{FfmpegNormalizer, Normalizer};
use crate::config::AppConfig;
use crate::doctor::report::{CheckResult, CheckStatus, DoctorReport, DoctorState};
use crate::history::{RecentLedger, SqliteLedger};

/// Probes everything `serve` leans on: the ffmpeg binary, a real conversion
/// round trip, the history database and the upstream engine.
pub async fn run_doctor(config: &AppConfig) -> DoctorReport {
    let mut checks = Vec::new();

    checks.push(check_binary_version(
        "ffmpeg",
        "4.0",
        true,
        Some("Install ffmpeg via your package manager."),
    ));
    checks.push(check_normalize_smoke().await);
    checks.push(check_storage(config));
    checks.push(check_engine(config).await);

    DoctorReport {
        generated_at_rfc3339: Utc::now().to_rfc3339(),
        state: derive_state(&checks),
        checks,
    }
}

fn derive_state(checks: &[CheckResult]) -> DoctorState {
    let required_failed = checks
        .iter()
        .any(|check| check.required && check.status == CheckStatus::Fail);
    let any_degraded = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Warn | CheckStatus::Fail));

    if required_failed {
        DoctorState::Unavailable
    } else if any_degraded {
        DoctorState::Degraded
    } else {
        DoctorState::Ready
    }
}

fn check_binary_version(
    binary: &str,
    min_version: &str,
    required: bool,
    remediation: Option<&str>,
) -> CheckResult {
    let path = match which::which(binary) {
        Ok(path) => path,
        Err(_) => {
            return CheckResult {
                name: binary.to_owned(),
                status: CheckStatus::Fail,
                detail: "binary not found in PATH".to_owned(),
                required,
                remediation: remediation.map(ToOwned::to_owned),
            }
        }
    };

    let output = version_output(binary);
    let parsed = output.as_deref().and_then(parse_version_triplet);

    match parsed {
        Some(found) if version_at_least(&found, &parse_target_version(min_version)) => {
            CheckResult {
                name: binary.to_owned(),
                status: CheckStatus::Pass,
                detail: format!(
                    "{} (>= {}) at {}",
                    version_triplet_string(&found),
                    min_version,
                    path.display()
                ),
                required,
                remediation: None,
            }
        }
        Some(found) => CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("{} (< {})", version_triplet_string(&found), min_version),
            required,
            remediation: remediation.map(ToOwned::to_owned),
        },
        None => CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Warn,
            detail: format!("installed at {}, version parse failed", path.display()),
            required,
            remediation: remediation.map(ToOwned::to_owned),
        },
    }
}

// ffmpeg prints its banner for `-version`; the others cover stragglers.
fn version_output(binary: &str) -> Option<String> {
    let variants = [["-version"], ["--version"], ["-V"]];

    for args in variants {
        let output = Command::new(binary).args(args).output().ok()?;
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        if !text.trim().is_empty() {
            return Some(text);
        }
    }

    None
}

fn parse_version_triplet(text: &str) -> Option<[u32; 3]> {
    let regex = Regex::new(r"(?P<a>\d+)\.(?P<b>\d+)(?:\.(?P<c>\d+))?").ok()?;
    let captures = regex.captures(text)?;

    let major = captures.name("a")?.as_str().parse::<u32>().ok()?;
    let minor = captures.name("b")?.as_str().parse::<u32>().ok()?;
    let patch = captures
        .name("c")
        .map(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(Some(0))?;

    Some([major, minor, patch])
}

fn parse_target_version(text: &str) -> [u32; 3] {
    let mut parts = text
        .split('.')
        .filter_map(|part| part.parse::<u32>().ok())
        .collect::<Vec<_>>();
    while parts.len() < 3 {
        parts.push(0);
    }

    [parts[0], parts[1], parts[2]]
}

fn version_at_least(found: &[u32; 3], required: &[u32; 3]) -> bool {
    found >= required
}

fn version_triplet_string(value: &[u32; 3]) -> String {
    format!("{}.{}.{}", value[0], value[1], value[2])
}

/// Generates one second of silence, then pushes it through the same ffmpeg
/// invocation the server applies to uploads.
async fn check_normalize_smoke() -> CheckResult {
    let name = "ffmpeg_normalize";

    if which::which("ffmpeg").is_err() {
        return CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Skip,
            detail: "ffmpeg missing, nothing to smoke test".to_owned(),
            required: true,
            remediation: Some("Install ffmpeg and rerun doctor.".to_owned()),
        };
    }

    let temp_dir = match tempfile::TempDir::new() {
        Ok(dir) => dir,
        Err(error) => {
            return CheckResult {
                name: name.to_owned(),
                status: CheckStatus::Warn,
                detail: format!("unable to create temp directory: {error}"),
                required: true,
                remediation: Some("Verify temporary directory permissions.".to_owned()),
            }
        }
    };

    let source = temp_dir.path().join("doctor-source.wav");
    let generated = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "anullsrc=r=44100:cl=stereo",
            "-t",
            "1",
        ])
        .arg(&source)
        .output();

    match generated {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            return CheckResult {
                name: name.to_owned(),
                status: CheckStatus::Fail,
                detail: format!(
                    "silence generation failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                required: true,
                remediation: Some("Verify the ffmpeg build includes lavfi.".to_owned()),
            }
        }
        Err(error) => {
            return CheckResult {
                name: name.to_owned(),
                status: CheckStatus::Fail,
                detail: format!("failed to execute ffmpeg: {error}"),
                required: true,
                remediation: Some("Verify ffmpeg installation.".to_owned()),
            }
        }
    }

    let converted = temp_dir.path().join("doctor-normalized.wav");
    match FfmpegNormalizer::new().normalize(&source, &converted).await {
        Ok(()) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Pass,
            detail: "silence clip converted to 16 kHz mono pcm_s16le".to_owned(),
            required: true,
            remediation: None,
        },
        Err(error) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("conversion failed: {error}"),
            required: true,
            remediation: Some("Run the printed ffmpeg command manually to inspect logs.".to_owned()),
        },
    }
}

fn check_storage(config: &AppConfig) -> CheckResult {
    let name = "storage";

    let ledger = match SqliteLedger::open(
        config.storage.db_path.clone(),
        config.limits.recent_limit,
    ) {
        Ok(ledger) => ledger,
        Err(error) => {
            return CheckResult {
                name: name.to_owned(),
                status: CheckStatus::Fail,
                detail: format!("cannot open {}: {error}", config.storage.db_path.display()),
                required: true,
                remediation: Some("Verify the storage.db_path directory is writable.".to_owned()),
            }
        }
    };

    match ledger.list_all() {
        Ok(records) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Pass,
            detail: format!(
                "{} holds {} stored transcriptions",
                config.storage.db_path.display(),
                records.len()
            ),
            required: true,
            remediation: None,
        },
        Err(error) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("ledger read failed: {error}"),
            required: true,
            remediation: Some("Inspect the database file permissions and contents.".to_owned()),
        },
    }
}

/// Reachability only. Any HTTP answer counts; the gateway can start without
/// the engine, so a dead engine degrades the report instead of failing it.
async fn check_engine(config: &AppConfig) -> CheckResult {
    let name = "engine";

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            return CheckResult {
                name: name.to_owned(),
                status: CheckStatus::Warn,
                detail: format!("probe client init failed: {error}"),
                required: false,
                remediation: None,
            }
        }
    };

    match client.get(&config.engine.url).send().await {
        Ok(response) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Pass,
            detail: format!("{} answered HTTP {}", config.engine.url, response.status()),
            required: false,
            remediation: None,
        },
        Err(error) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Warn,
            detail: format!("{} unreachable: {error}", config.engine.url),
            required: false,
            remediation: Some("Start the transcription engine or fix engine.url.".to_owned()),
        },
    }
}
