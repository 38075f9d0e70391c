use crate::error::FileError;
use crate::models::draft::ReadingDraft;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载阅读试卷草稿
pub async fn load_draft(toml_file_path: &Path) -> Result<ReadingDraft, FileError> {
    let path = toml_file_path.to_string_lossy().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path.clone(),
            source,
        })?;

    let draft: ReadingDraft = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
        path: path.clone(),
        source,
    })?;

    Ok(draft.with_file_path(path))
}

/// 从文件夹中加载所有草稿，解析失败的文件只记录警告
pub async fn load_all_drafts(folder_path: &str) -> Result<Vec<ReadingDraft>, FileError> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        });
    }

    let read_failed = |source| FileError::ReadFailed {
        path: folder_path.to_string(),
        source,
    };

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder).await.map_err(read_failed)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    // 目录遍历顺序不稳定，按文件名排序
    paths.sort();

    let mut drafts = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_draft(&path).await {
            Ok(draft) => {
                tracing::info!(
                    "成功加载草稿「{}」，共 {} 个部分 / {} 道题",
                    draft.title,
                    draft.parts.len(),
                    draft.question_total()
                );
                drafts.push(draft);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!("reading_drafts_{}_{}", tag, nanos));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn loads_only_valid_toml_files() {
        let dir = scratch_dir("load");
        std::fs::write(dir.join("a.toml"), "title = \"Academic Reading A\"\n").unwrap();
        std::fs::write(dir.join("b.toml"), "title = ").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let drafts = load_all_drafts(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Academic Reading A");
        assert!(drafts[0].file_path.as_deref().unwrap().ends_with("a.toml"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let err = load_all_drafts("/definitely/not/here").await.unwrap_err();
        assert!(matches!(err, FileError::DirectoryNotFound { .. }));
    }
}
