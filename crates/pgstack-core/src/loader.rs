//! スタックローダー
//!
//! ファイル発見、パース、環境変数による上書きを統合

use crate::declare::CONFIG_KEYS;
use crate::error::Result;
use crate::model::StackConfig;
use crate::parser::parse_stack_file;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// カレントディレクトリからスタックファイルを探してロード
///
/// スタックファイルのパスと設定を返します。
#[instrument]
pub fn load_stack() -> Result<(PathBuf, StackConfig)> {
    let path = pgstack_config::find_stack_file()?;
    let config = load_stack_from_path(&path)?;
    Ok((path, config))
}

/// Load a specific stack file and apply `PGSTACK_*` overrides
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_stack_from_path(path: &Path) -> Result<StackConfig> {
    debug!("Parsing stack file");
    let mut config = parse_stack_file(path)?;
    config.apply_overrides(CONFIG_KEYS, |var| std::env::var(var).ok());
    info!(stack = %config.name, "Stack configuration loaded");
    Ok(config)
}
