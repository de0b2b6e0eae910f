//! Document store builder: domain texts in, one knowledge index per domain out.

use std::collections::HashMap;
use std::sync::Arc;

use ragdesk_core::config::ChunkingConfig;
use ragdesk_core::{DataPaths, Domain, Error, Result};
use ragdesk_infer::EmbedderBackend;
use tracing::{debug, info, warn};

use crate::chunking::RecursiveChunker;
use crate::index::KnowledgeIndex;
use crate::knowledge::KnowledgeBase;
use crate::types::{DomainText, EntryMetadata, IndexEntry};

/// How domain texts are turned into retrievable units.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// `None`: each domain text is a single unit.
    pub chunking: Option<ChunkingConfig>,
}

/// Build one index per domain.
///
/// Fails with `DependencyUnavailable` if the embedder cannot embed any entry;
/// no partial knowledge base is produced.
pub fn build(
    domain_texts: &HashMap<Domain, DomainText>,
    embedder: &Arc<dyn EmbedderBackend>,
    options: &BuildOptions,
) -> Result<KnowledgeBase> {
    if !embedder.is_available() {
        return Err(Error::DependencyUnavailable(
            "embedding backend is not available".into(),
        ));
    }

    let mut indices = HashMap::new();
    for (&domain, text) in domain_texts {
        let index = build_index(domain, text, embedder, options)?;
        info!(
            domain = %domain,
            source = %text.source,
            entries = index.len(),
            "Built knowledge index"
        );
        indices.insert(domain, Arc::new(index));
    }

    Ok(KnowledgeBase::new(indices))
}

/// Build the index for a single domain.
pub fn build_index(
    domain: Domain,
    text: &DomainText,
    embedder: &Arc<dyn EmbedderBackend>,
    options: &BuildOptions,
) -> Result<KnowledgeIndex> {
    if domain == Domain::Unknown {
        return Err(Error::Config(
            "the unknown domain cannot own a knowledge index".into(),
        ));
    }

    let trimmed = text.text.trim();
    if trimmed.is_empty() {
        return Ok(KnowledgeIndex::empty(domain, embedder.clone()));
    }

    let contents: Vec<String> = match options.chunking {
        Some(cfg) => RecursiveChunker::new(cfg.chunk_size, cfg.chunk_overlap)
            .chunk(trimmed)
            .into_iter()
            .map(|c| c.text)
            .collect(),
        None => vec![trimmed.to_string()],
    };

    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    let embeddings = embedder
        .embed_batch(&refs)
        .into_iter()
        .map(|r| r.map(|r| r.embedding))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            Error::DependencyUnavailable(format!("failed to embed {} document", domain))
        })?;

    debug!("Embedded {} entries for {}", embeddings.len(), domain);

    let entries = contents
        .into_iter()
        .map(|content| IndexEntry {
            content,
            metadata: EntryMetadata {
                topic: domain,
                source: text.source.clone(),
            },
        })
        .collect();

    KnowledgeIndex::from_embeddings(domain, entries, embeddings, embedder.clone())
}

/// Read each known domain's source file from the data directory.
///
/// A missing file leaves the domain out; other read errors propagate.
pub fn load_domain_texts(paths: &DataPaths) -> Result<HashMap<Domain, DomainText>> {
    let mut texts = HashMap::new();

    for domain in Domain::KNOWN {
        let (Some(path), Some(source)) = (paths.domain_file(domain), domain.source_file()) else {
            continue;
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                texts.insert(domain, DomainText::new(text, source));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No {} document at {}", domain, path.display());
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }

    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_infer::{HashingEmbedder, NoopEmbedder};
    use tempfile::TempDir;

    fn embedder() -> Arc<dyn EmbedderBackend> {
        Arc::new(HashingEmbedder::new(128))
    }

    fn salary_only() -> HashMap<Domain, DomainText> {
        HashMap::from([(
            Domain::Salary,
            DomainText::new("  Base pay is computed monthly.\n", "salary.txt"),
        )])
    }

    #[test]
    fn test_single_unit_per_domain() {
        let kb = build(&salary_only(), &embedder(), &BuildOptions::default()).unwrap();
        let index = kb.get(Domain::Salary).unwrap();
        assert_eq!(index.domain(), Domain::Salary);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].content, "Base pay is computed monthly.");
        assert_eq!(index.entries()[0].metadata.topic, Domain::Salary);
        assert_eq!(index.entries()[0].metadata.source, "salary.txt");
        assert!(kb.get(Domain::Insurance).is_none());
    }

    #[test]
    fn test_empty_text_yields_empty_index() {
        let texts = HashMap::from([(Domain::Insurance, DomainText::new("   ", "insurance.txt"))]);
        let kb = build(&texts, &embedder(), &BuildOptions::default()).unwrap();
        assert!(kb.get(Domain::Insurance).unwrap().is_empty());
    }

    #[test]
    fn test_chunking_splits_and_keeps_metadata() {
        let text = "Premium is paid yearly.\n\nCashless claims need pre-approval.\n\n\
                    Hospital stays above 24 hours are covered.";
        let texts = HashMap::from([(Domain::Insurance, DomainText::new(text, "insurance.txt"))]);
        let options = BuildOptions {
            chunking: Some(ChunkingConfig {
                chunk_size: 40,
                chunk_overlap: 0,
            }),
        };
        let kb = build(&texts, &embedder(), &options).unwrap();
        let index = kb.get(Domain::Insurance).unwrap();
        assert!(index.len() >= 3);
        assert!(index
            .entries()
            .iter()
            .all(|e| e.metadata.source == "insurance.txt" && e.metadata.topic == Domain::Insurance));
    }

    #[test]
    fn test_unavailable_embedder_fails_build() {
        let noop: Arc<dyn EmbedderBackend> = Arc::new(NoopEmbedder::new(384));
        let result = build(&salary_only(), &noop, &BuildOptions::default());
        assert!(matches!(result, Err(Error::DependencyUnavailable(_))));
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let texts = HashMap::from([(Domain::Unknown, DomainText::new("x", "x.txt"))]);
        assert!(matches!(
            build(&texts, &embedder(), &BuildOptions::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_domain_texts_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("salary.txt"), "Gross pay is paid monthly.").unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();

        let texts = load_domain_texts(&paths).unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[&Domain::Salary].source, "salary.txt");
        assert_eq!(texts[&Domain::Salary].text, "Gross pay is paid monthly.");
    }
}
