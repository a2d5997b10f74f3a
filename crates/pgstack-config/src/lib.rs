pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that points directly at a stack file
pub const CONFIG_PATH_ENV: &str = "PGSTACK_CONFIG_PATH";

/// Per-project directory holding stack files and state
pub const PROJECT_DIR: &str = ".pgstack";

const CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// グローバル設定ディレクトリ (`~/.config/pgstack`) を取得。存在しなければ作成
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("pgstack");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトのスタックファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 `PGSTACK_CONFIG_PATH` (直接パス指定)
/// 2. カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. `./.pgstack/` ディレクトリ内: 同様の順序
/// 4. `~/.config/pgstack/stack.kdl` (グローバル設定)
pub fn find_stack_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            debug!(path = %path.display(), "Stack file from {}", CONFIG_PATH_ENV);
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    let project_dir = current_dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(path) = first_existing(&project_dir)
    {
        return Ok(path);
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join("stack.kdl");
        if global.exists() {
            debug!(path = %global.display(), "Using global stack file");
            return Ok(global);
        }
    }

    Err(ConfigError::StackFileNotFound)
}

/// Directory that owns the `.pgstack/` state tree for a stack file
///
/// A file inside `.pgstack/` belongs to the directory above it.
pub fn project_root(stack_file: &Path) -> PathBuf {
    let parent = stack_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    if parent.file_name().is_some_and(|name| name == PROJECT_DIR) {
        parent
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| parent.to_path_buf())
    } else {
        parent.to_path_buf()
    }
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
