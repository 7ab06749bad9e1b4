//! In-memory XML tree with element text/tail, built from `quick-xml` events.
//!
//! Each element carries two text slots: `text` is the character data before the
//! first child element, `tail` is the character data after an element's end tag
//! and before its next sibling. Comments and processing instructions are
//! dropped; the text around them is joined.
//!
//! Files are decoded with the encoding their declaration names. Entities
//! declared in the internal DTD subset are expanded; a reference that cannot
//! be resolved is kept verbatim without affecting its neighbours.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use crate::util::open_with_backoff;

/// Index of an element in its document. Ids follow document order.
pub type NodeId = usize;

#[derive(Clone, Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: Option<String>,
    tail: Option<String>,
}

#[derive(Clone, Debug)]
pub struct XmlDocument {
    nodes: Vec<Element>,
}

/// Internal-subset entity name -> replacement text.
type Entities = HashMap<String, String>;

impl XmlDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        Self::build(Reader::from_reader(BufReader::new(f)))
            .with_context(|| format!("parse {}", path.display()))
    }

    pub fn parse(xml: &str) -> Result<Self> {
        Self::build(Reader::from_str(xml))
    }

    fn build<R: BufRead>(mut reader: Reader<R>) -> Result<Self> {
        reader.config_mut().trim_text(false);

        let mut nodes: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut entities = Entities::new();
        let mut buf = Vec::new();

        loop {
            let pos = reader.buffer_position();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| anyhow!("XML error at byte {}: {}", pos, e))?;
            let decoder = reader.decoder();
            match event {
                Event::DocType(d) => {
                    declare_entities(&decode(decoder, &d)?, &mut entities);
                }
                Event::Start(e) => {
                    let id = open_element(&mut nodes, &stack, &e, decoder, &entities)?;
                    stack.push(id);
                }
                Event::Empty(e) => {
                    open_element(&mut nodes, &stack, &e, decoder, &entities)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(t) => {
                    let raw = decode(decoder, &t)?;
                    push_text(&mut nodes, &stack, &expand_references(&raw, &entities));
                }
                Event::CData(c) => {
                    push_text(&mut nodes, &stack, &decode(decoder, &c)?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            bail!("unexpected end of document: <{}> is not closed", nodes[*open].name);
        }
        if nodes.is_empty() {
            bail!("document has no root element");
        }
        Ok(Self { nodes })
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id]
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].text.as_deref()
    }

    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].tail.as_deref()
    }

    pub fn clear_tail(&mut self, id: NodeId) {
        self.nodes[id].tail = None;
    }

    /// Direct text nodes of an element: its text, then each child's tail.
    pub fn direct_texts(&self, id: NodeId) -> Vec<&str> {
        let el = &self.nodes[id];
        let mut out = Vec::with_capacity(el.children.len() + 1);
        if let Some(t) = el.text.as_deref() {
            out.push(t);
        }
        for &c in &el.children {
            if let Some(t) = self.nodes[c].tail.as_deref() {
                out.push(t);
            }
        }
        out
    }

    /// All elements strictly below `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev());
        }
        out
    }

    /// Concatenated character data inside the element, tags stripped.
    /// The element's own tail is not part of it; descendants' tails are.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let el = &self.nodes[id];
        if let Some(t) = &el.text {
            out.push_str(t);
        }
        for &c in &el.children {
            self.collect_text(c, out);
            if let Some(t) = &self.nodes[c].tail {
                out.push_str(t);
            }
        }
    }

    /// Serialize the element with its attributes and children, followed by its
    /// tail when one is still attached. Namespace declarations in scope from
    /// ancestors are repeated on the element so the result stands alone.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        let inherited = self.inherited_namespaces(id);
        self.write_markup(id, &inherited, &mut out);
        if let Some(t) = &self.nodes[id].tail {
            out.push_str(&escape_text(t));
        }
        out
    }

    /// `xmlns` / `xmlns:p` declarations of the ancestors, the nearest one per
    /// prefix, minus those the element redeclares itself.
    fn inherited_namespaces(&self, id: NodeId) -> Vec<(&str, &str)> {
        let mut ancestors = Vec::new();
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            ancestors.push(p);
            cur = self.nodes[p].parent;
        }

        let own = &self.nodes[id].attrs;
        let mut decls: Vec<(&str, &str)> = Vec::new();
        for &anc in ancestors.iter().rev() {
            for (k, v) in &self.nodes[anc].attrs {
                if !is_namespace_decl(k) || own.iter().any(|(o, _)| o == k) {
                    continue;
                }
                match decls.iter_mut().find(|(dk, _)| *dk == k.as_str()) {
                    Some(slot) => slot.1 = v.as_str(),
                    None => decls.push((k.as_str(), v.as_str())),
                }
            }
        }
        decls
    }

    fn write_markup(&self, id: NodeId, extra_attrs: &[(&str, &str)], out: &mut String) {
        let el = &self.nodes[id];
        out.push('<');
        out.push_str(&el.name);
        for (k, v) in extra_attrs {
            push_attr(out, k, v);
        }
        for (k, v) in &el.attrs {
            push_attr(out, k, v);
        }
        if el.text.is_none() && el.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(t) = &el.text {
            out.push_str(&escape_text(t));
        }
        for &c in &el.children {
            self.write_markup(c, &[], out);
            if let Some(t) = &self.nodes[c].tail {
                out.push_str(&escape_text(t));
            }
        }
        out.push_str("</");
        out.push_str(&el.name);
        out.push('>');
    }
}

fn open_element(
    nodes: &mut Vec<Element>,
    stack: &[NodeId],
    e: &BytesStart<'_>,
    decoder: Decoder,
    entities: &Entities,
) -> Result<NodeId> {
    let parent = stack.last().copied();
    if parent.is_none() && !nodes.is_empty() {
        bail!("document has more than one root element");
    }
    let name = decode(decoder, e.name().as_ref())?.into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| anyhow!("bad attribute on <{}>: {}", name, err))?;
        let key = decode(decoder, attr.key.as_ref())?.into_owned();
        let raw = decode(decoder, &attr.value)?;
        attrs.push((key, expand_references(&raw, entities).into_owned()));
    }
    let id = nodes.len();
    nodes.push(Element { name, attrs, parent, children: Vec::new(), text: None, tail: None });
    if let Some(p) = parent {
        nodes[p].children.push(id);
    }
    Ok(id)
}

/// Bytes in the document's declared encoding to UTF-8.
fn decode<'b>(decoder: Decoder, bytes: &'b [u8]) -> Result<Cow<'b, str>> {
    decoder
        .decode(bytes)
        .map_err(|e| anyhow!("cannot decode character data: {}", e))
}

fn entity_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // general entities with a literal value; parameter and external entities never match
    RE.get_or_init(|| {
        Regex::new(r#"<!ENTITY\s+([^\s%>]+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#).expect("static regex")
    })
}

/// Record `<!ENTITY name "value">` declarations of a DOCTYPE internal subset.
/// The first declaration of a name wins.
fn declare_entities(doctype: &str, entities: &mut Entities) {
    for caps in entity_decl_re().captures_iter(doctype) {
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2).or_else(|| caps.get(3))) else { continue };
        if entities.contains_key(name.as_str()) {
            continue;
        }
        let value = expand_references(value.as_str(), entities).into_owned();
        entities.insert(name.as_str().to_string(), value);
    }
}

/// Replace each `&...;` reference on its own: predefined, numeric, and
/// declared entities are expanded, anything else is left as written.
fn expand_references<'a>(raw: &'a str, entities: &Entities) -> Cow<'a, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let from_amp = &rest[amp..];
        let Some(semi) = from_amp.find(';') else {
            rest = from_amp;
            break;
        };
        let reference = &from_amp[..=semi];
        let resolved = unescape_with(reference, |name| {
            entities.get(name).map(String::as_str).or_else(|| resolve_predefined_entity(name))
        });
        match resolved {
            Ok(text) => out.push_str(&text),
            Err(err) => {
                tracing::debug!(reference, error=%err, "keeping unresolved reference as-is");
                out.push_str(reference);
            }
        }
        rest = &from_amp[semi + 1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn push_text(nodes: &mut [Element], stack: &[NodeId], s: &str) {
    if s.is_empty() {
        return;
    }
    let Some(&top) = stack.last() else {
        // prolog/epilog whitespace
        return;
    };
    let slot = match nodes[top].children.last().copied() {
        Some(last) => &mut nodes[last].tail,
        None => &mut nodes[top].text,
    };
    slot.get_or_insert_with(String::new).push_str(s);
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}

fn is_namespace_decl(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

fn escape_text(s: &str) -> Cow<'_, str> {
    quick_xml::escape::partial_escape(s)
}

fn escape_attr(s: &str) -> Cow<'_, str> {
    let escaped = quick_xml::escape::partial_escape(s);
    if escaped.contains('"') {
        Cow::Owned(escaped.replace('"', "&quot;"))
    } else {
        escaped
    }
}
