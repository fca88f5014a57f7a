//! Sandboxed invocation of the league's DOS-era game binary under a DOS
//! emulator.
//!
//! Each invocation gets its own per-(league, game) drive directory with
//! `inbound`/`outbound` subfolders, a synthesized emulator config and batch
//! file, and a wall-clock timeout. The emulator is wrapped in `script -c` so
//! its raw ANSI output survives into the captured log; prettifying that
//! output to HTML is explicitly out of scope here.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use nova_hub_common::GameType;
use thiserror::Error;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DosRunError {
    #[error("no dosemu configuration for league {league_number} game {game}")]
    MissingConfig { league_number: String, game: String },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error preparing sandbox: {0}")]
    Io(#[from] std::io::Error),
}

/// Which command to run inside the sandbox — one league/game config can
/// define all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DosCommandKind {
    Processing,
    Scores,
    RouteInfo,
    BbsInfo,
}

impl DosCommandKind {
    fn as_key(&self) -> &'static str {
        match self {
            DosCommandKind::Processing => "processing_command",
            DosCommandKind::Scores => "scores_command",
            DosCommandKind::RouteInfo => "routeinfo_command",
            DosCommandKind::BbsInfo => "bbsinfo_command",
        }
    }
}

/// Parameters for one sandboxed run, resolved by the caller from
/// `FileConfig::league_config` before invoking [`run`].
pub struct DosRunRequest<'a> {
    pub league_number: &'a str,
    pub game: GameType,
    pub command: &'a str,
    pub game_dos_path: &'a str,
    pub data_dir: &'a Path,
    pub dosemu_path: &'a str,
    pub dosemu_config_dir: &'a Path,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DosRunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub captured_output: String,
}

/// Run one command inside the sandbox and return its captured output.
/// Never leaves the synthesized batch file behind, success or failure.
pub async fn run(req: DosRunRequest<'_>) -> Result<DosRunOutcome, DosRunError> {
    let drive_path = req
        .data_dir
        .join("dosemu")
        .join(req.league_number)
        .join(req.game.as_config_key());
    fs::create_dir_all(&drive_path).await?;
    fs::create_dir_all(drive_path.join("inbound")).await?;
    fs::create_dir_all(drive_path.join("outbound")).await?;

    let conf_path = generate_dosemu_conf(req.game, req.dosemu_config_dir).await?;
    let batch_path = drive_path.join("PROCESS.BAT");
    write_batch_file(&batch_path, req.command, req.game_dos_path).await?;

    let log_path = req.data_dir.join("logs").join("dosemu").join(format!(
        "{}_{}_{}.log",
        req.league_number,
        req.game.as_config_key(),
        Utc::now().format("%Y%m%d_%H%M%S"),
    ));
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let result = run_with_timeout(
        req.dosemu_path,
        &conf_path,
        &batch_path,
        &log_path,
        req.data_dir,
        req.timeout,
    )
    .await;

    // Always clean up the ephemeral batch file, regardless of outcome.
    let _ = fs::remove_file(&batch_path).await;

    result
}

async fn run_with_timeout(
    dosemu_path: &str,
    conf_path: &Path,
    batch_path: &Path,
    log_path: &Path,
    working_dir: &Path,
    wall_clock_timeout: Duration,
) -> Result<DosRunOutcome, DosRunError> {
    match timeout(
        wall_clock_timeout,
        run_under_script(dosemu_path, conf_path, batch_path, log_path, working_dir),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(?wall_clock_timeout, "dosemu invocation timed out");
            Err(DosRunError::Timeout(wall_clock_timeout))
        }
    }
}

/// Wrap the emulator invocation in `script -c` so its raw ANSI output
/// lands in `log_path` exactly as produced.
async fn run_under_script(
    dosemu_path: &str,
    conf_path: &Path,
    batch_path: &Path,
    log_path: &Path,
    working_dir: &Path,
) -> Result<DosRunOutcome, DosRunError> {
    let dosemu_cmd = format!(
        "{} -f {} {}",
        shell_quote(dosemu_path),
        shell_quote(&conf_path.display().to_string()),
        shell_quote(&batch_path.display().to_string()),
    );

    let output = Command::new("script")
        .arg("-c")
        .arg(&dosemu_cmd)
        .arg(log_path)
        .current_dir(working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    // If `script` itself failed to start the emulator, its stdout/stderr is
    // the only record we have — fall back to it instead of an empty log.
    if !output.status.success() && !output.stdout.is_empty() {
        fs::write(log_path, &output.stdout).await?;
    }

    let captured_output = fs::read_to_string(log_path).await.unwrap_or_default();

    info!(
        exit_code = ?output.status.code(),
        bytes = captured_output.len(),
        "dosemu invocation finished",
    );

    Ok(DosRunOutcome {
        success: output.status.success(),
        exit_code: output.status.code(),
        captured_output,
    })
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Headless, quiet, no-DPMI, video-off emulator configuration — DPMI is
/// dropped deliberately, it segfaults and the game binaries don't need it.
async fn generate_dosemu_conf(
    game: GameType,
    config_dir: &Path,
) -> Result<PathBuf, std::io::Error> {
    fs::create_dir_all(config_dir).await?;
    let conf_path = config_dir.join(format!("{}.conf", game.as_config_key()));

    let contents = r#"$_layout = "us"
$_floppy_a = ""
$_xms = (8192)
$_ems = (8192)
$_X = ""
$_vga = "off"
$_graphics = "off"
$_com1 = ""
$_com2 = ""
$_quiet = (1)
"#;
    fs::write(&conf_path, contents).await?;
    Ok(conf_path)
}

/// In DOS, `CD` alone never changes drives — the drive letter must be
/// selected first, then `CD` into the path.
async fn write_batch_file(
    batch_path: &Path,
    command: &str,
    game_dos_path: &str,
) -> Result<(), std::io::Error> {
    let mut contents = String::from("@ECHO OFF\nECHO Nova Hub Processing Starting\n");

    let drive_letter = game_dos_path
        .as_bytes()
        .get(1)
        .filter(|&&b| b == b':')
        .map(|_| &game_dos_path[..2]);

    if let Some(drive) = drive_letter {
        contents.push_str(&format!("ECHO Changing to: {game_dos_path}\n"));
        contents.push_str(&format!("{drive}\n"));
        contents.push_str(&format!("CD {game_dos_path}\n"));
        contents.push_str("CD\n");
    } else {
        contents.push_str(&format!("CD {game_dos_path}\n"));
    }

    contents.push_str(command);
    contents.push('\n');
    contents.push_str("ECHO Nova Hub Processing Complete\nEXIT\n");

    fs::write(batch_path, contents).await
}
