use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use album_core::ArticleRecord;
use album_logging::album_info;
use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;

const MAX_STEM_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Files written by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub directory: PathBuf,
    /// Article files in record order.
    pub files: Vec<PathBuf>,
    pub readme: PathBuf,
}

/// Writes extracted articles as Markdown files plus a README into one directory.
pub struct MarkdownExporter {
    dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write_all(
        &self,
        records: &[ArticleRecord],
        extracted_at: DateTime<Utc>,
    ) -> Result<ExportSummary, ExportError> {
        ensure_output_dir(&self.dir)?;
        let stamp = extracted_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut files = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let filename = article_filename(index + 1, &record.title);
            let document = format!("{}{}", front_matter(record, &stamp), record.content);
            files.push(write_atomic(&self.dir, &filename, &document)?);
        }
        let readme = write_atomic(&self.dir, "README.md", &readme(records.len(), &stamp))?;

        album_info!(
            "exported {} articles to {}",
            files.len(),
            self.dir.display()
        );
        Ok(ExportSummary {
            directory: self.dir.clone(),
            files,
            readme,
        })
    }
}

/// `{index:03}_{sanitized_title}.md`, with `index` 1-based.
pub fn article_filename(index: usize, title: &str) -> String {
    format!("{index:03}_{}.md", sanitize_filename(title))
}

/// Replaces everything except ASCII word characters, `-`, `.` and CJK
/// ideographs with `_`, then caps the result at 80 characters.
pub fn sanitize_filename(title: &str) -> String {
    let mut cleaned: String = title
        .trim()
        .chars()
        .map(|c| if is_kept(c) { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect();
    if cleaned.trim_matches(['_', '.']).is_empty() {
        cleaned = "untitled".to_string();
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{4e00}'..='\u{9fa5}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn front_matter(record: &ArticleRecord, extracted_at: &str) -> String {
    let mut block = String::from("---\n");
    block.push_str(&format!("title: {}\n", quoted(&record.title)));
    if let Some(author) = &record.author {
        block.push_str(&format!("author: {}\n", quoted(author)));
    }
    if let Some(time) = &record.publish_time {
        block.push_str(&format!("publishTime: {}\n", quoted(time)));
    }
    block.push_str(&format!("originalUrl: {}\n", quoted(&record.url)));
    block.push_str(&format!("extractedAt: {}\n", quoted(extracted_at)));
    block.push_str("---\n\n");
    block
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn readme(count: usize, extracted_at: &str) -> String {
    format!(
        "# Extracted articles\n\n\
         - Extracted at: {extracted_at}\n\
         - Articles: {count}\n\n\
         Files are named `NNN_title.md` in album order. Images are remote links \
         and need network access to display.\n"
    )
}

fn ensure_output_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Temp file in the target directory, then rename over `{dir}/{filename}`.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, ExportError> {
    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_cjk_and_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("深度 学习: 入门/进阶?"), "深度_学习__入门_进阶_");
        assert_eq!(sanitize_filename("v1.2-release"), "v1.2-release");
        assert_eq!(sanitize_filename("???"), "untitled");
        assert_eq!(sanitize_filename("con"), "con_");
    }

    #[test]
    fn sanitize_caps_length_in_characters() {
        let long = "文".repeat(200);
        assert_eq!(sanitize_filename(&long).chars().count(), 80);
    }

    #[test]
    fn quoted_escapes_embedded_quotes() {
        assert_eq!(quoted(r#"a "b""#), r#""a \"b\"""#);
    }
}
