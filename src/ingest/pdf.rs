use anyhow::{Context, Result};
use async_trait::async_trait;
use lopdf::Object;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::DocumentSource;
use crate::models::Document;

/// Page separator emitted by `pdftotext`.
const FORM_FEED: char = '\u{c}';

/// Local PDFs (plus plain-text and markdown files) from a file or directory.
///
/// A file path also pulls in the other PDFs next to it, so several handbooks
/// can be dropped into one directory.
pub struct PdfSource {
    path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Text,
}

impl PdfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Files to load, sorted by name within their directory.
    fn resolve_files(&self) -> Result<Vec<(PathBuf, FileKind)>> {
        if !self.path.exists() {
            anyhow::bail!("Document path not found: {}", self.path.display());
        }

        let files = if self.path.is_dir() {
            list_dir(&self.path)
                .into_iter()
                .filter_map(|p| file_kind(&p).map(|kind| (p, kind)))
                .collect()
        } else {
            let kind = file_kind(&self.path)
                .with_context(|| format!("Unsupported document type: {}", self.path.display()))?;
            let mut files = vec![(self.path.clone(), kind)];
            if let Some(dir) = self.path.parent() {
                files.extend(
                    list_dir(dir)
                        .into_iter()
                        .filter(|p| *p != self.path && file_kind(p) == Some(FileKind::Pdf))
                        .map(|p| (p, FileKind::Pdf)),
                );
            }
            files
        };

        if files.is_empty() {
            anyhow::bail!("No PDF or text files found in {}", self.path.display());
        }
        Ok(files)
    }
}

#[async_trait]
impl DocumentSource for PdfSource {
    async fn fetch(&self) -> Result<Vec<Document>> {
        let files = self.resolve_files()?;
        let mut documents = Vec::new();

        for (path, kind) in files {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();

            let loaded = match kind {
                FileKind::Pdf => {
                    let text = extract_pdf_text(&path).await?;
                    let links = load_page_links(&path).await;
                    pages_to_documents(&file_name, &text, &links)
                }
                FileKind::Text => {
                    let text = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    if text.trim().is_empty() {
                        Vec::new()
                    } else {
                        vec![Document::new(file_name.clone(), file_name.clone(), text)]
                    }
                }
            };

            tracing::info!("Loaded {} pages with text from {}", loaded.len(), path.display());
            documents.extend(loaded);
        }

        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("files:{}", self.path.display())
    }
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect()
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => Some(FileKind::Pdf),
        "txt" | "md" => Some(FileKind::Text),
        _ => None,
    }
}

/// Run `pdftotext` (poppler) and return its UTF-8 output.
async fn extract_pdf_text(path: &Path) -> Result<String> {
    let output = tokio::process::Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .await
        .context("Failed to run pdftotext (is poppler installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pdftotext failed on {}: {}", path.display(), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Hyperlink URIs per zero-based page index.
type PageLinks = BTreeMap<usize, Vec<String>>;

/// Link annotations of every page. `pdftotext` drops them, so they are read
/// separately. Failures are logged and yield no links.
async fn load_page_links(path: &Path) -> PageLinks {
    let owned = path.to_path_buf();
    let loaded = tokio::task::spawn_blocking(move || {
        lopdf::Document::load(&owned)
            .map(|doc| page_links(&doc))
            .map_err(anyhow::Error::from)
    })
    .await
    .map_err(anyhow::Error::from)
    .and_then(|r| r);

    match loaded {
        Ok(links) => links,
        Err(e) => {
            tracing::debug!("Skipping link annotations for {}: {e:#}", path.display());
            PageLinks::new()
        }
    }
}

/// URIs of `/Link` annotations, keyed by zero-based page index.
fn page_links(doc: &lopdf::Document) -> PageLinks {
    let mut links = PageLinks::new();
    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Ok(annots) = page.get(b"Annots").map(|o| resolve(doc, o)) else {
            continue;
        };
        let Ok(annots) = annots.as_array() else {
            continue;
        };

        let uris: Vec<String> = annots
            .iter()
            .filter_map(|annot| link_uri(doc, resolve(doc, annot)))
            .collect();
        if !uris.is_empty() {
            links.insert(page_number.saturating_sub(1) as usize, uris);
        }
    }
    links
}

fn link_uri(doc: &lopdf::Document, annot: &Object) -> Option<String> {
    let annot = annot.as_dict().ok()?;
    if annot.get(b"Subtype").ok()?.as_name().ok()? != b"Link" {
        return None;
    }
    let action = resolve(doc, annot.get(b"A").ok()?).as_dict().ok()?;
    let uri = resolve(doc, action.get(b"URI").ok()?).as_str().ok()?;
    let uri = String::from_utf8_lossy(uri).trim().to_string();
    (!uri.is_empty()).then_some(uri)
}

/// Follow an indirect reference, leaving direct objects as they are.
fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// One document per page with text or links. Page numbers are zero-based and
/// count skipped pages, so ids stay stable when a page is empty. Link URIs are
/// appended as `[Link: <uri>]` lines.
fn pages_to_documents(file_name: &str, text: &str, links: &PageLinks) -> Vec<Document> {
    text.split(FORM_FEED)
        .enumerate()
        .filter_map(|(idx, page)| {
            let mut page_text = page.trim().to_string();
            if let Some(uris) = links.get(&idx) {
                let link_lines: Vec<String> =
                    uris.iter().map(|uri| format!("[Link: {uri}]")).collect();
                if !page_text.is_empty() {
                    page_text.push_str("\n\n");
                }
                page_text.push_str(&link_lines.join("\n"));
            }
            if page_text.is_empty() {
                return None;
            }
            Some(Document::new(
                format!("{file_name}-page-{idx}"),
                file_name,
                page_text,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use lopdf::dictionary;

    #[test]
    fn test_pages_split_on_form_feed() {
        let text = "Welcome\u{c}  \n\u{c}Vault Access\u{c}";
        let docs = pages_to_documents("handbook.pdf", text, &PageLinks::new());
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0],
            Document::new("handbook.pdf-page-0", "handbook.pdf", "Welcome")
        );
        assert_eq!(docs[1].id, "handbook.pdf-page-2");
        assert_eq!(docs[1].text, "Vault Access");
    }

    #[test]
    fn test_page_links_appended_to_page_text() {
        let mut links = PageLinks::new();
        links.insert(0, vec!["https://it.example.com/portal".to_string()]);
        links.insert(
            1,
            vec![
                "https://vault.example.com".to_string(),
                "https://wiki.example.com/vault".to_string(),
            ],
        );

        let docs = pages_to_documents("handbook.pdf", "Open the IT portal.\u{c}  ", &links);
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].text,
            "Open the IT portal.\n\n[Link: https://it.example.com/portal]"
        );
        // A page with links but no extracted text is kept.
        assert_eq!(docs[1].id, "handbook.pdf-page-1");
        assert_eq!(
            docs[1].text,
            "[Link: https://vault.example.com]\n[Link: https://wiki.example.com/vault]"
        );
    }

    #[test]
    fn test_page_links_read_link_annotations() {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let link_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal("https://it.example.com/portal"),
            },
        });
        let note_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Text",
            "Contents" => Object::string_literal("not a link"),
        });
        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Annots" => vec![link_id.into(), note_id.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), second.into()],
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let links = page_links(&doc);
        assert_eq!(links.len(), 1);
        assert_eq!(links[&1], vec!["https://it.example.com/portal".to_string()]);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_yields_no_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(load_page_links(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_directory_loads_text_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Vault\nRequest access.").unwrap();
        std::fs::write(dir.path().join("a.txt"), "GitHub access via SSO.").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "   ").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0u8, 1, 2]).unwrap();

        let docs = PdfSource::new(dir.path()).fetch().await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.md"]);
        assert_eq!(docs[0].text, "GitHub access via SSO.");
    }

    #[tokio::test]
    async fn test_single_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Lunch at noon.").unwrap();
        std::fs::write(dir.path().join("other.txt"), "Not picked up.").unwrap();

        let docs = PdfSource::new(&path).fetch().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "notes.txt");
    }

    #[tokio::test]
    async fn test_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PdfSource::new(dir.path().join("nope"))
            .fetch()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8]).unwrap();
        assert!(PdfSource::new(dir.path()).fetch().await.is_err());
    }
}
