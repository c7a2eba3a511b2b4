use super::*;
use pretty_assertions::assert_eq;

const ITALIAN_ARMY: &str = r#"(a / army :mod (c / country :name (n / name :op1 "Italy")) :location (p / province :name (n2 / name :op1 "Burgundy")))"#;

fn parse_ok(text: &str) -> Amr {
    let parse = parse_amr(text);
    assert!(parse.diagnostics.is_empty(), "unexpected diagnostics: {:?}", parse.diagnostics);
    parse.amr.expect("AMR should parse")
}

#[test]
fn test_parse_builds_graph() {
    let amr = parse_ok(ITALIAN_ARMY);
    let root = amr.root().unwrap();

    assert_eq!(amr.len(), 5);
    assert_eq!(amr.concept(root), "army");
    assert_eq!(amr.node(root).variable, "a");

    let country = amr.child(root, "mod").unwrap();
    assert_eq!(amr.concept(country), "country");
    assert_eq!(amr.node(country).parents, vec![root]);
    assert_eq!(amr.entity_name(country).as_deref(), Some("Italy"));

    let province = amr.child(root, "location").unwrap();
    assert_eq!(amr.entity_name(province).as_deref(), Some("Burgundy"));
    assert_eq!(amr.entity_name(root), None);
}

#[test]
fn test_multi_word_entity_names() {
    let amr = parse_ok(r#"(s / sea :name (n / name :op1 "North" :op2 "Sea"))"#);
    assert_eq!(amr.entity_name(amr.root().unwrap()).as_deref(), Some("North Sea"));
}

#[test]
fn test_reentrancy_links_to_defined_node() {
    let amr = parse_ok("(a / foo :arg1 (b / bar :arg2 a))");
    let a = amr.root().unwrap();
    let b = amr.child(a, "arg1").unwrap();

    assert_eq!(amr.filler(b, "arg2"), Some(&Filler::Node(a)));
    assert!(amr.node(a).parents.contains(&b));
    assert_eq!(
        amr.to_text().unwrap(),
        "(a / foo\n      :arg1 (b / bar\n            :arg2 a))"
    );
}

#[test]
fn test_forward_reference_is_patched() {
    let amr = parse_ok("(a / foo :arg1 b :arg2 (b / bar))");
    let a = amr.root().unwrap();
    let b = amr.lookup("b").unwrap();

    assert_eq!(amr.filler(a, "arg1"), Some(&Filler::Node(b)));
    assert_eq!(amr.filler(a, "arg2"), Some(&Filler::Node(b)));
    assert!(amr.node(b).parents.iter().all(|&p| p == a));
}

#[test]
fn test_unresolved_reference_is_reported() {
    let parse = parse_amr("# ::id t.1\n(a / foo :arg1 z)");
    let amr = parse.amr.unwrap();

    assert_eq!(
        parse.diagnostics,
        vec![AmrDiagnostic::UnresolvedReference {
            variable: "z".into(),
            id: "t.1".into(),
        }]
    );
    assert_eq!(
        amr.filler(amr.root().unwrap(), "arg1"),
        Some(&Filler::Unresolved("z".into()))
    );
}

#[test]
fn test_comment_block_fields_and_source() {
    let text = "# ::id dip_0001.3 ::date 2022\n# ::snt Italy holds in Burgundy.\n(h / hold-03\n   :ARG1 (u / unit))\n\n";
    let parse = parse_amr(text);
    let amr = parse.amr.unwrap();

    assert_eq!(amr.id.as_deref(), Some("dip_0001.3"));
    assert_eq!(amr.sentence.as_deref(), Some("Italy holds in Burgundy."));
    assert_eq!(amr.source, "(h / hold-03\n   :ARG1 (u / unit))");
    assert_eq!(&text[parse.consumed..], "\n\n");
}

#[test]
fn test_literal_fillers() {
    let amr = parse_ok(r#"(s / say-01 :polarity - :ARG1 "a \"quoted\" word" :quant 3)"#);
    let root = amr.root().unwrap();

    assert_eq!(amr.filler(root, "polarity"), Some(&Filler::Unquoted("-".into())));
    assert_eq!(
        amr.filler(root, "ARG1"),
        Some(&Filler::Quoted(r#"a \"quoted\" word"#.into()))
    );
    assert_eq!(amr.filler(root, "quant"), Some(&Filler::Unquoted("3".into())));
}

#[test]
fn test_identifier_like_tokens_are_not_variables() {
    let amr = parse_ok("(a / foo :mode imperative :arg1 a2b)");
    let root = amr.root().unwrap();
    assert_eq!(amr.filler(root, "mode"), Some(&Filler::Unquoted("imperative".into())));
    assert_eq!(amr.filler(root, "arg1"), Some(&Filler::Unquoted("a2b".into())));
}

#[test]
fn test_missing_close_paren_is_inserted() {
    let parse = parse_amr("(a / foo :arg1 (b / bar)");
    assert!(parse.amr.is_some());
    assert!(matches!(
        parse.diagnostics.as_slice(),
        [AmrDiagnostic::MissingCloseParen(_)]
    ));
}

#[test]
fn test_role_without_filler_truncates_node() {
    let parse = parse_amr("(a / foo :arg1 (b / bar :arg2) :arg3 x3)");
    let amr = parse.amr.unwrap();
    let b = amr.lookup("b").unwrap();

    assert!(amr.node(b).roles.is_empty());
    assert!(matches!(
        parse.diagnostics.first(),
        Some(AmrDiagnostic::UnexpectedFiller { role, .. }) if role == "arg2"
    ));
}

#[test]
fn test_non_amr_group_is_skipped() {
    let parse = parse_amr("(a / foo :arg1 (123 junk) :arg2 \"ok\")");
    let amr = parse.amr.unwrap();
    let root = amr.root().unwrap();

    assert_eq!(
        parse.diagnostics,
        vec![AmrDiagnostic::UnexpectedNonAmr("(123 junk) :arg2 \"ok\")".into())]
    );
    assert_eq!(amr.node(root).roles.len(), 1);
    assert_eq!(amr.filler(root, "arg2"), Some(&Filler::Quoted("ok".into())));
}

#[test]
fn test_no_graph_yields_no_root() {
    let parse = parse_amr("   not an amr");
    assert!(parse.amr.is_none());
    assert_eq!(parse.consumed, "   not an amr".len());
}

#[test]
fn test_stream_reads_all_amrs() {
    let text = "# ::id 1\n(a / foo)\n\n# ::id 2\n(b / bar :arg0 (c / baz))\n\n";
    let amrs: Vec<ParsedAmr> = read_amrs(text).collect::<Result<_, _>>().unwrap();

    assert_eq!(amrs.len(), 2);
    assert_eq!(amrs[0].amr.id.as_deref(), Some("1"));
    assert_eq!(amrs[1].amr.id.as_deref(), Some("2"));
    assert_eq!(amrs[1].amr.len(), 2);
}

#[test]
fn test_stream_stops_at_non_amr_text() {
    let text = "(a / foo)\n(b / bar)\ngarbage here\n(c / baz)";
    let items: Vec<Result<ParsedAmr, AmrError>> = read_amrs(text).collect();

    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(items[1].is_ok());
    assert!(matches!(&items[2], Err(AmrError::NoAmr { snippet, .. }) if snippet.starts_with("garbage")));
}

#[test]
fn test_print_inlines_name_lists() {
    let amr = parse_ok(ITALIAN_ARMY);
    assert_eq!(
        amr.to_text().unwrap(),
        "(a / army\n      :mod (c / country :name (n / name :op1 \"Italy\"))\n      :location (p / province :name (n2 / name :op1 \"Burgundy\")))"
    );
}

#[test]
fn test_print_then_parse_round_trip() {
    let original = parse_ok(
        r#"(s / submit-01 :ARG0 (w / we) :ARG1 (h / hold-03 :polarity - :ARG1 (a / army :mod (c / country :name (n / name :op1 "England")) :location (p / province :name (n2 / name :op1 "Liverpool")))))"#,
    );
    let printed = original.to_text().unwrap();
    let reparsed = parse_ok(&printed);

    assert_eq!(reparsed.len(), original.len());
    assert_eq!(reparsed.to_text().unwrap(), printed);
    let concepts = |amr: &Amr| -> Vec<String> {
        (0..amr.len()).map(|i| amr.node(NodeId(i)).concept.clone()).collect()
    };
    assert_eq!(concepts(&reparsed), concepts(&original));
}

#[test]
fn test_print_guards_against_cycles() {
    let amr = parse_ok("(a / foo :arg1 (b / bar :arg2 (c / baz :arg3 b)) :arg4 c)");
    assert_eq!(
        amr.to_text().unwrap(),
        "(a / foo\n      :arg1 (b / bar\n            :arg2 (c / baz\n                  :arg3 b))\n      :arg4 c)"
    );
}

fn nested(depth: usize) -> String {
    let mut text = String::new();
    for i in 0..depth {
        text.push_str(&format!("(x{i} / foo :arg "));
    }
    text.push_str("(y / bar)");
    text.push_str(&")".repeat(depth));
    text
}

#[test]
fn test_deep_nesting_fails_printing_only() {
    let amr = parse_ok(&nested(150));
    assert_eq!(amr.len(), 151);
    assert_eq!(amr.to_text(), Err(PrintError::TooDeep(MAX_PRINT_DEPTH)));
}

#[test]
fn test_excessive_nesting_is_cut_while_parsing() {
    let parse = parse_amr(&nested(MAX_NESTING_DEPTH + 20));
    let amr = parse.amr.unwrap();

    assert_eq!(amr.len(), MAX_NESTING_DEPTH + 1);
    assert!(matches!(
        parse.diagnostics.as_slice(),
        [AmrDiagnostic::TooDeep(MAX_NESTING_DEPTH, _)]
    ));
}

#[test]
fn test_ancestor_search_survives_cycles() {
    let amr = parse_ok("(p / propose-01 :ARG1 (h / have-03 :ARG0 (c / country :poss h)))");
    let have = amr.lookup("h").unwrap();
    let country = amr.lookup("c").unwrap();

    assert!(amr.has_ancestor_in(have, &["propose-01".to_string()]));
    assert!(amr.has_ancestor_in(country, &["propose-01".to_string()]));
    assert!(!amr.has_ancestor_in(country, &["agree-01".to_string()]));
}
