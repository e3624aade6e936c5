//! Creates the `.git` directory for a new on-disk repository.
//!
//! The layout matches what `git init` produces, minus the sample hooks.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub(super) fn create_git_dir(work_dir: &Path) -> Result<()> {
    let git_dir = work_dir.join(".git");
    if git_dir.exists() {
        return Err(Error::GitDirShouldntExist(git_dir));
    }

    fs::create_dir_all(&git_dir)?;

    create_config(&git_dir)?;
    create_description(&git_dir)?;
    create_head(&git_dir)?;
    create_hooks_dir(&git_dir)?;
    create_info_dir(&git_dir)?;
    create_objects_dir(&git_dir)?;
    create_refs_dir(&git_dir)?;

    tracing::info!(path = %git_dir.display(), "initialized empty repository");
    Ok(())
}

fn create_config(git_dir: &Path) -> Result<()> {
    let config_path = git_dir.join("config");
    let config_txt = "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = false\n\tlogallrefupdates = true\n";

    fs::write(config_path, config_txt).map_err(|e| e.into())
}

fn create_description(git_dir: &Path) -> Result<()> {
    let desc_path = git_dir.join("description");
    let desc_txt = "Unnamed repository; edit this file 'description' to name the repository.\n";

    fs::write(desc_path, desc_txt).map_err(|e| e.into())
}

fn create_head(git_dir: &Path) -> Result<()> {
    let head_path = git_dir.join("HEAD");
    let head_txt = "ref: refs/heads/master\n";

    fs::write(head_path, head_txt).map_err(|e| e.into())
}

fn create_hooks_dir(git_dir: &Path) -> Result<()> {
    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(&hooks_dir).map_err(|e| e.into())
}

fn create_info_dir(git_dir: &Path) -> Result<()> {
    let info_dir = git_dir.join("info");
    fs::create_dir_all(&info_dir)?;

    let exclude_path = info_dir.join("exclude");
    let exclude_txt = "# git ls-files --others --exclude-from=.git/info/exclude\n# Lines that start with '#' are comments.\n# For a project mostly in C, the following would be a good set of\n# exclude patterns (uncomment them if you want to use them):\n# *.[oa]\n# *~\n.DS_Store\n";

    fs::write(exclude_path, exclude_txt).map_err(|e| e.into())
}

fn create_objects_dir(git_dir: &Path) -> Result<()> {
    fs::create_dir_all(git_dir.join("objects/info"))?;
    fs::create_dir_all(git_dir.join("objects/pack")).map_err(|e| e.into())
}

fn create_refs_dir(git_dir: &Path) -> Result<()> {
    fs::create_dir_all(git_dir.join("refs/heads"))?;
    fs::create_dir_all(git_dir.join("refs/tags")).map_err(|e| e.into())
}
