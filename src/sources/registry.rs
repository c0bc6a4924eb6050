//! Registry for managing research source plugins.

use std::sync::Arc;

use super::{ArxivSource, SemanticScholarSource, Source, SourceError};
use crate::config::Config;
use crate::utils::HttpClient;

/// Every source this build can construct: `(id, name)`
const KNOWN_SOURCES: [(&str, &str); 2] = [("arxiv", "arXiv"), ("semantic_scholar", "Semantic Scholar")];

/// Ordered collection of enabled sources.
///
/// Order matters: the aggregator merges results in registry order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the enabled sources from configuration, in configured order
    pub fn from_config(config: &Config, client: Arc<HttpClient>) -> Self {
        let mut registry = Self::new();
        for name in &config.sources.enabled {
            match build_source(name, config, Arc::clone(&client)) {
                Some(source) => registry.register(source),
                None => tracing::warn!("Ignoring unknown source '{}'", name),
            }
        }
        registry
    }

    /// Register a new source; a second source with the same id is ignored
    pub fn register(&mut self, source: Arc<dyn Source>) {
        if self.get(source.id()).is_some() {
            tracing::warn!("Source '{}' is already registered", source.id());
            return;
        }
        self.sources.push(source);
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Get a source by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn Source>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::NotFound(format!("Source '{}' not found", id)))
    }

    /// Get all source IDs, in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn into_sources(self) -> Vec<Arc<dyn Source>> {
        self.sources
    }
}

fn canonical_id(name: &str) -> Option<&'static str> {
    match name.trim().to_lowercase().as_str() {
        "arxiv" => Some("arxiv"),
        "semantic_scholar" | "semantic" | "semanticscholar" => Some("semantic_scholar"),
        _ => None,
    }
}

fn build_source(name: &str, config: &Config, client: Arc<HttpClient>) -> Option<Arc<dyn Source>> {
    let overfetch = config.search.overfetch_factor;
    let source: Arc<dyn Source> = match canonical_id(name)? {
        "arxiv" => Arc::new(ArxivSource::new(client, &config.sources.arxiv).with_overfetch(overfetch)),
        "semantic_scholar" => Arc::new(
            SemanticScholarSource::new(client, &config.sources.semantic).with_overfetch(overfetch),
        ),
        _ => return None,
    };
    Some(source)
}

/// Description of a known source for listings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub enabled: bool,
}

/// All sources this build knows about and whether the config enables them
pub fn known_sources(config: &Config) -> Vec<SourceInfo> {
    KNOWN_SOURCES
        .iter()
        .map(|&(id, name)| SourceInfo {
            id,
            name,
            enabled: config
                .sources
                .enabled
                .iter()
                .any(|n| canonical_id(n) == Some(id)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::sources::MockSource;

    fn client() -> Arc<HttpClient> {
        Arc::new(HttpClient::new(&TransportConfig::default()).unwrap())
    }

    #[test]
    fn test_default_config_enables_arxiv_only() {
        let registry = SourceRegistry::from_config(&Config::default(), client());
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["arxiv"]);
    }

    #[test]
    fn test_configured_order_and_unknown_names() {
        let mut config = Config::default();
        config.sources.enabled = vec![
            "semantic".to_string(),
            "nonexistent".to_string(),
            "arxiv".to_string(),
            "ArXiv".to_string(),
        ];
        let registry = SourceRegistry::from_config(&config, client());
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["semantic_scholar", "arxiv"]
        );
        assert!(registry.get_required("pubmed").is_err());
    }

    #[test]
    fn test_known_sources() {
        let infos = known_sources(&Config::default());
        assert_eq!(infos.len(), 2);
        assert!(infos[0].enabled);
        assert!(!infos[1].enabled);
    }

    #[test]
    fn test_register_ignores_duplicates() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("mock")));
        registry.register(Arc::new(MockSource::new("mock")));
        assert_eq!(registry.len(), 1);
    }
}
