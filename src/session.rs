//! Inspection session
//!
//! [`Session`] owns everything about one loaded document: the source
//! document, the normalized tree, the namespace registry, the display list,
//! filter and XPath state, and the compiled-expression cache. Every
//! operation goes through it; loading a new document resets all of it.

use crate::dom::XmlDocument;
use crate::error::{Error, EvaluationError, ParseError, Result};
use crate::schema::{analyze, generate_xsd, SchemaAnalysis, XsdOptions};
use crate::tree::{build_tree, export, NamespaceRegistry, ParseStatistics, TreeIndex, TreeNode};
use crate::view::{DisplayList, FilterState, FilterSummary};
use crate::xpath::{
    evaluate, focus, generate_xpath, map_matches, ExprCache, MatchMapping, MatchState, NavigationTarget,
    XPathStrategy, DEFAULT_CACHE_SIZE, MAX_MAPPED_MATCHES,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Session tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Compiled expressions kept in the LRU
    pub xpath_cache_size: usize,
    /// Results above this count are reported but not mapped to lines
    pub max_mapped_matches: usize,
    pub default_strategy: XPathStrategy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            xpath_cache_size: DEFAULT_CACHE_SIZE,
            max_mapped_matches: MAX_MAPPED_MATCHES,
            default_strategy: XPathStrategy::Absolute,
        }
    }
}

/// How an evaluation is reflected in the view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateOptions {
    /// Hide everything but the matches and their surroundings
    pub filter_view: bool,
    pub mapping: MatchMapping,
}

/// Outcome of [`Session::evaluate_xpath`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XPathReport {
    pub expression: String,
    /// Every selected item
    pub total: usize,
    /// Matches bound to a display line
    pub mapped: usize,
    /// Too many matches to map
    pub capped: bool,
}

/// Per-document state, present only after a successful load
#[derive(Debug)]
struct Loaded {
    source: XmlDocument,
    root: TreeNode,
    stats: ParseStatistics,
    display: DisplayList,
    source_name: Option<String>,
    schema: Option<SchemaAnalysis>,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    cache: ExprCache,
    registry: NamespaceRegistry,
    loaded: Option<Loaded>,
    filter: FilterState,
    /// Filter state from before the XPath view filter, while one is active
    xpath_filter: Option<FilterState>,
    matches: MatchState,
    strategy: XPathStrategy,
    selected: Option<usize>,
    generated: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_config(SessionConfig::default())
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Session {
            cache: ExprCache::new(config.xpath_cache_size),
            strategy: config.default_strategy,
            config,
            registry: NamespaceRegistry::new(),
            loaded: None,
            filter: FilterState::default(),
            xpath_filter: None,
            matches: MatchState::default(),
            selected: None,
            generated: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ==================================================================
    // Loading
    // ==================================================================

    /// Parse and build a document, replacing whatever was loaded.
    ///
    /// Previous state is dropped even when parsing fails.
    pub fn load(&mut self, text: &str) -> Result<&ParseStatistics> {
        self.load_inner(text, None)
    }

    /// [`load`](Self::load), remembering a source name for schema headers
    pub fn load_named(&mut self, name: &str, text: &str) -> Result<&ParseStatistics> {
        self.load_inner(text, Some(name.to_string()))
    }

    fn load_inner(&mut self, text: &str, source_name: Option<String>) -> Result<&ParseStatistics> {
        self.reset();

        let source = XmlDocument::parse(text).inspect_err(|e| debug!("parse failed: {}", e))?;
        let built = build_tree(&source, &mut self.registry)
            .ok_or_else(|| ParseError::new("Document has no root element", 0))?;
        let display = DisplayList::render(&built.root, &self.registry);
        debug!(
            "loaded <{}>: {} elements, depth {}",
            built.root.tag_name, built.stats.total_elements, built.stats.max_depth
        );

        let loaded = self.loaded.insert(Loaded {
            source,
            root: built.root,
            stats: built.stats,
            display,
            source_name,
            schema: None,
        });
        Ok(&loaded.stats)
    }

    fn reset(&mut self) {
        self.loaded = None;
        self.registry.clear();
        self.cache.clear();
        self.filter = FilterState::default();
        self.xpath_filter = None;
        self.matches.clear();
        self.strategy = self.config.default_strategy;
        self.selected = None;
        self.generated = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn tree(&self) -> Option<&TreeNode> {
        self.loaded.as_ref().map(|l| &l.root)
    }

    pub fn statistics(&self) -> Option<&ParseStatistics> {
        self.loaded.as_ref().map(|l| &l.stats)
    }

    pub fn source(&self) -> Option<&XmlDocument> {
        self.loaded.as_ref().map(|l| &l.source)
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn display(&self) -> Option<&DisplayList> {
        self.loaded.as_ref().map(|l| &l.display)
    }

    /// For collapse and expand
    pub fn display_mut(&mut self) -> Option<&mut DisplayList> {
        self.loaded.as_mut().map(|l| &mut l.display)
    }

    /// Tree as JSON records
    pub fn export_json(&self, pretty: bool) -> Result<String> {
        let root = self.tree().ok_or(Error::NotLoaded)?;
        let json = if pretty {
            export::to_json_pretty(root)
        } else {
            export::to_json(root)
        };
        json.map_err(|e| Error::Export(e.to_string()))
    }

    // ==================================================================
    // Schema
    // ==================================================================

    /// Element profiles, computed on first request
    pub fn schema_analysis(&mut self) -> Result<&SchemaAnalysis> {
        let loaded = self.loaded.as_mut().ok_or(Error::SchemaUnavailable)?;
        let (source, root) = (&loaded.source, loaded.root.source);
        Ok(loaded.schema.get_or_insert_with(|| analyze(source, root)))
    }

    /// XSD for the loaded document; the load name fills in a missing source name
    pub fn generate_schema(&mut self, options: &XsdOptions) -> Result<String> {
        let source_name = self.loaded.as_ref().and_then(|l| l.source_name.clone());
        let analysis = self.schema_analysis()?;
        if options.source_name.is_none() && source_name.is_some() {
            let options = XsdOptions {
                source_name,
                ..options.clone()
            };
            return Ok(generate_xsd(analysis, &options));
        }
        Ok(generate_xsd(analysis, options))
    }

    // ==================================================================
    // Filters
    // ==================================================================

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    /// Replace the filter state and re-filter the view.
    ///
    /// An active XPath view filter is discarded, not restored.
    pub fn apply_filters(&mut self, state: FilterState) -> Option<FilterSummary> {
        self.xpath_filter = None;
        self.filter = state;
        self.refilter()
    }

    /// Back to the default filter state
    pub fn clear_filters(&mut self) -> Option<FilterSummary> {
        self.apply_filters(FilterState::default())
    }

    fn refilter(&mut self) -> Option<FilterSummary> {
        let loaded = self.loaded.as_mut()?;
        let index = TreeIndex::new(&loaded.root);
        Some(loaded.display.apply_filters(&index, &self.filter))
    }

    pub fn xpath_filter_active(&self) -> bool {
        self.xpath_filter.is_some()
    }

    /// Restore the filter state captured when the XPath view filter was applied
    pub fn clear_xpath_filter(&mut self) -> Option<FilterSummary> {
        let snapshot = self.xpath_filter.take()?;
        self.filter = snapshot;
        self.refilter()
    }

    // ==================================================================
    // XPath generation
    // ==================================================================

    pub fn strategy(&self) -> XPathStrategy {
        self.strategy
    }

    pub fn selected_line(&self) -> Option<usize> {
        self.selected
    }

    /// Last generated expression
    pub fn generated_xpath(&self) -> Option<&str> {
        self.generated.as_deref()
    }

    /// Expression for any line, without touching the selection
    pub fn generate_xpath(&mut self, line: usize, strategy: XPathStrategy) -> Result<String> {
        let loaded = self.loaded.as_ref().ok_or(EvaluationError::NoDocument)?;
        let index = TreeIndex::new(&loaded.root);
        Ok(generate_xpath(&index, &loaded.source, &mut self.cache, line, strategy)?)
    }

    /// Select a line and generate its expression with the current strategy
    pub fn select_line(&mut self, line: usize) -> Result<String> {
        let xpath = self.generate_xpath(line, self.strategy)?;
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.display.select(line);
        }
        self.selected = Some(line);
        self.generated = Some(xpath.clone());
        Ok(xpath)
    }

    /// Switch strategy, regenerating for the current selection if any
    pub fn set_strategy(&mut self, strategy: XPathStrategy) -> Result<Option<String>> {
        self.strategy = strategy;
        match self.selected {
            Some(line) => self.select_line(line).map(Some),
            None => Ok(None),
        }
    }

    /// Drop the selection and the generated expression
    pub fn clear_xpath(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.display.clear_selection();
        }
        self.selected = None;
        self.generated = None;
    }

    // ==================================================================
    // XPath evaluation
    // ==================================================================

    pub fn matches(&self) -> &MatchState {
        &self.matches
    }

    /// Evaluate against the source document and reflect the matches in the view.
    ///
    /// A failed evaluation leaves match and filter state as they were.
    pub fn evaluate_xpath(&mut self, expression: &str, options: EvaluateOptions) -> Result<XPathReport> {
        let loaded = self.loaded.as_ref().ok_or(EvaluationError::NoDocument)?;
        let result = evaluate(&loaded.source, &mut self.cache, expression)?;
        let capped = result.total > self.config.max_mapped_matches;

        let lines = if capped || result.elements.is_empty() {
            if capped {
                debug!("{} matches, above the mapping cap of {}", result.total, self.config.max_mapped_matches);
            }
            Vec::new()
        } else {
            let index = TreeIndex::new(&loaded.root);
            map_matches(&loaded.source, &result.elements, &index, &loaded.display, options.mapping)
        };

        self.clear_evaluation();
        if let Some(loaded) = self.loaded.as_mut() {
            for &line in &lines {
                if let Some(entry) = loaded.display.line_mut(line) {
                    entry.xpath_match = true;
                }
            }
            if options.filter_view && !lines.is_empty() {
                self.xpath_filter = Some(self.filter.clone());
                loaded.display.show_only(&lines);
            }
        }

        let mapped = lines.len();
        self.matches = MatchState::new(lines);
        self.next_match();

        Ok(XPathReport {
            expression: expression.trim().to_string(),
            total: result.total,
            mapped,
            capped,
        })
    }

    /// Move to the next match, wrapping to the first
    pub fn next_match(&mut self) -> Option<NavigationTarget> {
        let line = self.matches.advance()?;
        self.navigate(line)
    }

    /// Move to the previous match, wrapping to the last
    pub fn previous_match(&mut self) -> Option<NavigationTarget> {
        let line = self.matches.retreat()?;
        self.navigate(line)
    }

    fn navigate(&mut self, line: usize) -> Option<NavigationTarget> {
        let target = focus(&mut self.loaded.as_mut()?.display, line)?;
        self.selected = Some(line);
        self.generated = self.generate_xpath(line, self.strategy).ok();
        Some(target)
    }

    /// Drop match emphasis and match state, restoring the view if it was filtered
    pub fn clear_evaluation(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.display.clear_match_flags();
        }
        self.matches.clear();
        self.clear_xpath_filter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<library><book id="b1"><title>Dune</title></book><book id="b2"><title>Emma</title></book></library>"#;

    fn loaded() -> Session {
        let mut session = Session::new();
        session.load(XML).unwrap();
        session
    }

    #[test]
    fn test_failed_load_clears_state() {
        let mut session = loaded();
        assert!(session.is_loaded());
        let err = session.load("<a><b></a>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(!session.is_loaded());
        assert!(session.registry().is_empty());
        assert!(matches!(session.schema_analysis(), Err(Error::SchemaUnavailable)));
        assert!(matches!(session.export_json(false), Err(Error::NotLoaded)));
    }

    #[test]
    fn test_evaluate_requires_document() {
        let mut session = Session::new();
        let err = session.evaluate_xpath("//a", EvaluateOptions::default()).unwrap_err();
        assert_eq!(err, Error::Evaluation(EvaluationError::NoDocument));
    }

    #[test]
    fn test_select_and_switch_strategy() {
        let mut session = loaded();
        assert_eq!(session.select_line(3).unwrap(), "/library[1]/book[2]");
        assert!(session.display().unwrap().line(3).unwrap().selected);
        assert_eq!(
            session.set_strategy(XPathStrategy::Optimized).unwrap().as_deref(),
            Some("//book[@id='b2']")
        );
        assert_eq!(session.generated_xpath(), Some("//book[@id='b2']"));
        session.clear_xpath();
        assert_eq!(session.generated_xpath(), None);
        assert!(!session.display().unwrap().line(3).unwrap().selected);
        assert_eq!(session.set_strategy(XPathStrategy::Relative).unwrap(), None);
    }

    #[test]
    fn test_evaluate_navigates_to_first_match() {
        let mut session = loaded();
        let report = session.evaluate_xpath(" //title ", EvaluateOptions::default()).unwrap();
        assert_eq!(
            report,
            XPathReport { expression: "//title".to_string(), total: 2, mapped: 2, capped: false }
        );
        assert_eq!(session.matches().current_line(), Some(2));
        assert_eq!(session.generated_xpath(), Some("/library[1]/book[1]/title[1]"));

        let next = session.next_match().unwrap();
        assert_eq!(next, NavigationTarget { line: 4, line_number: 5 });
        assert_eq!(session.next_match().unwrap().line, 2);
        assert_eq!(session.previous_match().unwrap().line, 4);
    }

    #[test]
    fn test_failed_evaluation_keeps_state() {
        let mut session = loaded();
        session.evaluate_xpath("//book", EvaluateOptions::default()).unwrap();
        let before = session.matches().clone();
        assert!(matches!(
            session.evaluate_xpath("count(//book)", EvaluateOptions::default()),
            Err(Error::Evaluation(EvaluationError::NotNodeSet("number")))
        ));
        assert!(matches!(
            session.evaluate_xpath("//x:book", EvaluateOptions::default()),
            Err(Error::Evaluation(EvaluationError::UnboundPrefix(_)))
        ));
        assert_eq!(session.matches(), &before);
    }

    #[test]
    fn test_cap_reports_without_mapping() {
        let mut session = Session::with_config(SessionConfig {
            max_mapped_matches: 2,
            ..Default::default()
        });
        session.load(XML).unwrap();
        let report = session.evaluate_xpath("//*", EvaluateOptions::default()).unwrap();
        assert_eq!(report.total, 5);
        assert!(report.capped);
        assert_eq!(report.mapped, 0);
        assert!(session.next_match().is_none());
    }

    #[test]
    fn test_schema_uses_load_name() {
        let mut session = Session::new();
        session.load_named("books.xml", XML).unwrap();
        let xsd = session.generate_schema(&XsdOptions::default()).unwrap();
        assert!(xsd.contains("from XML file: books.xml"));
        assert_eq!(session.schema_analysis().unwrap().len(), 3);
    }
}
