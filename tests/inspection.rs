//! End-to-end inspection through `Session`

use xmlscope::schema::{infer_type, ChildOccurs, ScalarType};
use xmlscope::tree::export;
use xmlscope::{
    EvaluateOptions, FilterState, MatchMapping, ParseStatistics, Session, TreeNode, XPathStrategy, XsdOptions,
};

const CATALOG: &str = r#"<?xml version="1.0"?>
<catalog xmlns="urn:cat" xmlns:p="urn:price">
  <book id="bk1" lang="en">
    <title>Dune</title>
    <p:price currency="USD">9.99</p:price>
  </book>
  <book id="bk2" lang="fr">
    <title>L'Étranger</title>
    <p:price currency="EUR">7.50</p:price>
  </book>
  <magazine>
    <title>Wired</title>
  </magazine>
  <note/>
</catalog>"#;

fn session(xml: &str) -> Session {
    let mut session = Session::new();
    session.load(xml).unwrap();
    session
}

fn visible_lines(session: &Session) -> Vec<usize> {
    session
        .display()
        .unwrap()
        .lines()
        .iter()
        .filter(|l| l.visible)
        .map(|l| l.node)
        .collect()
}

#[test]
fn node_indices_are_dense_pre_order() {
    let session = session(CATALOG);
    let root = session.tree().unwrap();
    let indices: Vec<usize> = root.iter().map(|n| n.node_index).collect();
    let expected: Vec<usize> = (0..indices.len()).collect();
    assert_eq!(indices, expected);
    assert_eq!(indices.len(), session.statistics().unwrap().total_elements);
}

#[test]
fn child_depth_is_parent_depth_plus_one() {
    let session = session(CATALOG);
    let root = session.tree().unwrap();
    assert_eq!(root.depth, 0);
    for node in root.iter() {
        for child in &node.children {
            assert_eq!(child.depth, node.depth + 1, "{}", child.tag_name);
        }
    }
}

#[test]
fn statistics_round_trip_through_json() {
    let session = session(CATALOG);
    let stats = session.statistics().unwrap().clone();
    assert_eq!(stats.total_elements, 10);
    assert_eq!(stats.max_depth, 2);
    assert_eq!(stats.text_nodes, 5);
    assert_eq!(
        stats.distinct_tags.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["book", "catalog", "magazine", "note", "p:price", "title"]
    );

    let json = session.export_json(true).unwrap();
    let back: TreeNode = export::from_json(&json).unwrap();
    assert_eq!(ParseStatistics::from_tree(&back, stats.source_bytes), stats);

    let stats_json = serde_json::to_string(&stats).unwrap();
    let stats_back: ParseStatistics = serde_json::from_str(&stats_json).unwrap();
    assert_eq!(stats_back, stats);
}

#[test]
fn namespaces_coloured_in_first_seen_order() {
    let session = session(CATALOG);
    let entries: Vec<_> = session
        .registry()
        .iter()
        .map(|e| (e.uri.as_str(), e.prefix.as_str(), e.color.class_name()))
        .collect();
    assert_eq!(
        entries,
        vec![("urn:cat", "default", "namespace-default"), ("urn:price", "p", "namespace-1")]
    );
}

#[test]
fn absolute_xpath_distinguishes_siblings() {
    let mut session = session("<a><b/><b/></a>");
    assert_eq!(session.select_line(2).unwrap(), "/a[1]/b[2]");
    let options = EvaluateOptions {
        mapping: MatchMapping::Identity,
        ..Default::default()
    };
    let report = session.evaluate_xpath("/a[1]/b[2]", options).unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(session.matches().lines(), &[2]);

    // Tag-name mapping binds the match to the first <b> line
    session.evaluate_xpath("/a[1]/b[2]", EvaluateOptions::default()).unwrap();
    assert_eq!(session.matches().lines(), &[1]);
}

#[test]
fn optimized_xpath_uses_id() {
    let mut session = session(CATALOG);
    session.set_strategy(XPathStrategy::Optimized).unwrap();
    assert_eq!(session.select_line(4).unwrap(), "//book[@id='bk2']");
    assert_eq!(session.select_line(5).unwrap(), "//title[text()=\"L'Étranger\"]");
    assert_eq!(session.select_line(3).unwrap(), "//p:price[@currency='USD']");
    assert_eq!(session.select_line(9).unwrap(), "//note");
}

#[test]
fn schema_counts_repeated_children() {
    let mut session = session("<list><item>1</item><item>2</item><item>3</item></list>");
    let analysis = session.schema_analysis().unwrap();
    let list = analysis.profile("list").unwrap();
    assert_eq!(list.occurrences["item"], ChildOccurs { min: 3, max: 3 });
    let item = analysis.profile("item").unwrap();
    assert_eq!(item.content_types.iter().copied().collect::<Vec<_>>(), vec![ScalarType::Integer]);

    let xsd = session.generate_schema(&XsdOptions::default()).unwrap();
    assert!(xsd.contains(r#"<xs:element name="item" type="xs:integer" minOccurs="3" maxOccurs="3"/>"#));
}

#[test]
fn type_inference_table() {
    let table = [
        ("", ScalarType::String),
        ("True", ScalarType::Boolean),
        ("-12", ScalarType::Integer),
        (".25", ScalarType::Decimal),
        ("1999-12-31", ScalarType::Date),
        ("1999-12-31T23:59:59", ScalarType::DateTime),
        ("23:59:59", ScalarType::Time),
        ("n/a", ScalarType::String),
    ];
    for (value, expected) in table {
        assert_eq!(infer_type(value), expected, "{:?}", value);
    }
}

#[test]
fn xpath_filter_restores_previous_filter_exactly() {
    let mut session = session(CATALOG);
    let state = FilterState {
        search: "title".to_string(),
        ..Default::default()
    };
    session.apply_filters(state.clone()).unwrap();
    let before = visible_lines(&session);
    let highlighted: Vec<_> = session.display().unwrap().lines().iter().map(|l| l.highlights.clone()).collect();

    let options = EvaluateOptions {
        filter_view: true,
        mapping: MatchMapping::Identity,
    };
    let report = session.evaluate_xpath("//book[@lang='fr']", options).unwrap();
    assert_eq!(report.mapped, 1);
    assert!(session.xpath_filter_active());
    assert_eq!(visible_lines(&session), vec![0, 4, 5, 6]);

    session.clear_xpath_filter().unwrap();
    assert!(!session.xpath_filter_active());
    assert_eq!(session.filter_state(), &state);
    assert_eq!(visible_lines(&session), before);
    let after: Vec<_> = session.display().unwrap().lines().iter().map(|l| l.highlights.clone()).collect();
    assert_eq!(after, highlighted);
}

#[test]
fn applying_filters_discards_xpath_filter() {
    let mut session = session(CATALOG);
    let options = EvaluateOptions {
        filter_view: true,
        ..Default::default()
    };
    session.evaluate_xpath("//magazine", options).unwrap();
    assert!(session.xpath_filter_active());

    let summary = session.clear_filters().unwrap();
    assert!(!session.xpath_filter_active());
    assert_eq!(summary.visible, summary.total);
    assert!(session.clear_xpath_filter().is_none());
}

#[test]
fn filtering_is_idempotent() {
    let mut session = session(CATALOG);
    let state = FilterState {
        search: "e".to_string(),
        include_empty: false,
        ..Default::default()
    };
    let first = session.apply_filters(state.clone()).unwrap();
    let lines = session.display().unwrap().lines().to_vec();
    let second = session.apply_filters(state).unwrap();
    assert_eq!(first, second);
    assert_eq!(session.display().unwrap().lines(), lines.as_slice());
}

#[test]
fn clear_evaluation_resets_matches_and_view() {
    let mut session = session(CATALOG);
    let options = EvaluateOptions {
        filter_view: true,
        ..Default::default()
    };
    session.evaluate_xpath("//title", options).unwrap();
    assert_eq!(session.matches().len(), 3);
    assert!(session.display().unwrap().lines().iter().any(|l| l.current_match));

    session.clear_evaluation();
    assert!(session.matches().is_empty());
    assert!(!session.xpath_filter_active());
    let display = session.display().unwrap();
    assert!(display.lines().iter().all(|l| !l.xpath_match && !l.current_match && l.visible));
}

#[test]
fn attribute_results_are_counted_not_mapped() {
    let mut session = session(CATALOG);
    let report = session.evaluate_xpath("//book/@id", EvaluateOptions::default()).unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.mapped, 0);
    assert!(!report.capped);
}

fn nested(depth: usize) -> String {
    format!("{}{}", "<d>".repeat(depth), "</d>".repeat(depth))
}

#[test]
fn deep_document_exports_without_recursion() {
    let session = session(&nested(50_000));
    let json = session.export_json(false).unwrap();
    assert_eq!(json.matches(r#""tagName":"d""#).count(), 50_000);
    assert!(json.ends_with(r#""nodeIndex":0}"#));
}

#[test]
fn deep_document_is_released_on_reload() {
    let mut session = session(&nested(50_000));
    assert_eq!(session.statistics().unwrap().max_depth, 49_999);
    session.load("<a/>").unwrap();
    assert_eq!(session.statistics().unwrap().total_elements, 1);
}
