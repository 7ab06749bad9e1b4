use xetl::{Selector, XmlDocument};

const DOC: &str = r#"<?xml version="1.0"?>
<article>
  <front>
    <abstract id="a" lang="en">First <b>bold</b> tail</abstract>
    <abstract>Second</abstract>
  </front>
  <body>
    <sec><p>One</p><p>Two</p></sec>
    <sec><p>Three</p></sec>
  </body>
</article>
"#;

fn doc() -> XmlDocument {
    XmlDocument::parse(DOC).unwrap()
}

fn texts(doc: &XmlDocument, selector: &str) -> Vec<String> {
    let sel = Selector::compile(selector).unwrap();
    sel.select(doc).into_iter().map(|id| doc.inner_text(id)).collect()
}

fn names(doc: &XmlDocument, selector: &str) -> Vec<String> {
    let sel = Selector::compile(selector).unwrap();
    sel.select(doc).into_iter().map(|id| doc.name(id).to_string()).collect()
}

#[test]
fn text_and_tail_are_split_at_child_boundaries() {
    let d = doc();
    let first = Selector::compile("//abstract[1]").unwrap().select(&d)[0];
    assert_eq!(d.text(first), Some("First "));
    let b = d.children(first)[0];
    assert_eq!(d.name(b), "b");
    assert_eq!(d.text(b), Some("bold"));
    assert_eq!(d.tail(b), Some(" tail"));
    assert_eq!(d.inner_text(first), "First bold tail");
    assert_eq!(d.attr(first, "lang"), Some("en"));
    assert_eq!(d.attr(first, "missing"), None);
}

#[test]
fn inner_text_excludes_own_tail_but_markup_keeps_it() {
    let mut d = XmlDocument::parse("<r><x>in</x> after</r>").unwrap();
    let x = d.children(d.root())[0];
    assert_eq!(d.inner_text(x), "in");
    assert_eq!(d.to_markup(x), "<x>in</x> after");
    d.clear_tail(x);
    assert_eq!(d.to_markup(x), "<x>in</x>");
    assert_eq!(d.inner_text(d.root()), "in");
}

#[test]
fn entities_are_decoded_and_escaped_again_in_markup() {
    let d = XmlDocument::parse(r#"<r k="a&amp;b"><x>1 &lt; 2 &amp;&amp; 3 &gt; 2</x><e/></r>"#).unwrap();
    let x = d.children(d.root())[0];
    assert_eq!(d.inner_text(x), "1 < 2 && 3 > 2");
    assert_eq!(d.to_markup(x), "<x>1 &lt; 2 &amp;&amp; 3 &gt; 2</x>");
    assert_eq!(d.attr(d.root(), "k"), Some("a&b"));
    let e = d.children(d.root())[1];
    assert_eq!(d.to_markup(e), "<e/>");
}

#[test]
fn cdata_and_comments() {
    let d = XmlDocument::parse("<r>a<!-- skipped -->b<![CDATA[<c>]]></r>").unwrap();
    assert_eq!(d.inner_text(d.root()), "ab<c>");
}

#[test]
fn malformed_documents_are_errors() {
    assert!(XmlDocument::parse("").is_err());
    assert!(XmlDocument::parse("<a><b></a>").is_err());
    assert!(XmlDocument::parse("<a><b>").is_err());
    assert!(XmlDocument::parse("<a/><b/>").is_err());
}

#[test]
fn descendant_and_relative_paths() {
    let d = doc();
    assert_eq!(texts(&d, ".//abstract"), vec!["First bold tail", "Second"]);
    assert_eq!(texts(&d, "//abstract"), vec!["First bold tail", "Second"]);
    // relative paths start at the root element
    assert_eq!(texts(&d, "front/abstract"), vec!["First bold tail", "Second"]);
    assert!(texts(&d, "article/front").is_empty());
    assert_eq!(names(&d, "/article/front/*"), vec!["abstract", "abstract"]);
    assert_eq!(names(&d, "/article"), vec!["article"]);
}

#[test]
fn positional_predicates_apply_per_parent() {
    let d = doc();
    assert_eq!(texts(&d, "//p[1]"), vec!["One", "Three"]);
    assert_eq!(texts(&d, "//p[last()]"), vec!["Two", "Three"]);
    assert_eq!(texts(&d, "descendant::p[2]"), vec!["Two"]);
    assert!(texts(&d, "//sec[3]").is_empty());
}

#[test]
fn attribute_text_and_child_predicates() {
    let d = doc();
    assert_eq!(texts(&d, "//abstract[@id]"), vec!["First bold tail"]);
    assert_eq!(texts(&d, "//abstract[@id='a']"), vec!["First bold tail"]);
    assert!(texts(&d, "//abstract[@id=\"b\"]").is_empty());
    assert_eq!(texts(&d, "//abstract[not(@id)]"), vec!["Second"]);
    assert_eq!(texts(&d, "//abstract[@lang!='de']"), vec!["First bold tail"]);
    assert_eq!(texts(&d, "//p[text()='Two']"), vec!["Two"]);
    assert_eq!(texts(&d, "//abstract[contains(text(), 'Fir')]"), vec!["First bold tail"]);
    assert_eq!(texts(&d, "//sec[p='Three']"), vec!["Three"]);
    assert_eq!(texts(&d, "//sec[p]"), vec!["OneTwo", "Three"]);
}

#[test]
fn parent_and_self_steps() {
    let d = doc();
    assert_eq!(names(&d, "//b/.."), vec!["abstract"]);
    assert_eq!(names(&d, "//p/parent::sec"), vec!["sec", "sec"]);
    assert_eq!(names(&d, "//front/self::front"), vec!["front"]);
}

#[test]
fn union_is_deduplicated_in_document_order() {
    let d = doc();
    assert_eq!(
        names(&d, "//p | //abstract | //abstract[1]"),
        vec!["abstract", "abstract", "p", "p", "p"]
    );
}

#[test]
fn unsupported_or_broken_selectors_fail_to_compile() {
    for bad in ["", "/", "//", "//p[", "//p[0]", "//@id", "//p[foo()]", "//p/text()", "ancestor::p", "//p]"] {
        let err = Selector::compile(bad).err().unwrap_or_else(|| panic!("{:?} should not compile", bad));
        assert!(err.to_string().contains("invalid selector"), "{}", err);
    }
}

#[test]
fn selector_displays_its_source() {
    let sel = Selector::compile(".//abstract").unwrap();
    assert_eq!(sel.as_str(), ".//abstract");
    assert_eq!(sel.to_string(), ".//abstract");
}

#[test]
fn internal_subset_entities_are_expanded_next_to_predefined_ones() {
    let xml = r#"<!DOCTYPE article [<!ENTITY foo "bar"> <!ENTITY copy '&#169; us'>]>
<article><abstract k="&foo;">A &amp; B &foo; C &#233; &copy;</abstract></article>"#;
    let d = XmlDocument::parse(xml).unwrap();
    let a = d.children(d.root())[0];
    assert_eq!(d.inner_text(a), "A & B bar C é © us");
    assert_eq!(d.attr(a, "k"), Some("bar"));
}

#[test]
fn unknown_entity_is_kept_without_affecting_its_neighbours() {
    let d = XmlDocument::parse("<r>A &amp; &nbsp; &#x41; AT&T said; ok &lt;</r>").unwrap();
    assert_eq!(d.inner_text(d.root()), "A & &nbsp; A AT&T said; ok <");
}

#[test]
fn declared_encoding_is_honoured_when_reading_files() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("latin1.xml");
    let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<article><abstract>caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b" au lait</abstract></article>\n");
    std::fs::write(&path, bytes).unwrap();

    let d = XmlDocument::open(&path).unwrap();
    let a = d.children(d.root())[0];
    assert_eq!(d.inner_text(a), "café au lait");
}

#[test]
fn markup_repeats_namespace_declarations_in_scope() {
    let xml = r#"<article xmlns="urn:jats" xmlns:mml="urn:mml"><front xmlns:mml="urn:mml2"><abstract><mml:math/> x</abstract></front></article>"#;
    let d = XmlDocument::parse(xml).unwrap();
    let abs = Selector::compile("//abstract").unwrap().select(&d)[0];
    assert_eq!(
        d.to_markup(abs),
        r#"<abstract xmlns="urn:jats" xmlns:mml="urn:mml2"><mml:math/> x</abstract>"#
    );

    // own declarations are not duplicated
    let d = XmlDocument::parse(r#"<r xmlns:a="u1"><x xmlns:a="u2">t</x></r>"#).unwrap();
    let x = d.children(d.root())[0];
    assert_eq!(d.to_markup(x), r#"<x xmlns:a="u2">t</x>"#);
}
