use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use super::RawDocument;

/// Content containers, most specific first. The document root is the last resort.
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["div.mw-parser-output", "div#mw-content-text", "article", "body"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Table classes used by navigation and info boxes. Untagged tables are kept.
const NOISE_TABLE_CLASSES: &[&str] = &["navbox", "infobox", "toccolours", "mw-collapsible"];

/// One inline run of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Bold(String),
    Italic(String),
    Other(String),
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    pub runs: Vec<Inline>,
    /// Visible text, trimmed pieces joined by single spaces.
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TableCell {
    pub text: String,
    pub has_image: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub cells: Vec<TableCell>,
    /// `alt` (or `data-image-name`) of every image, in document order.
    pub image_labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListItem {
    pub text: String,
    pub in_toc: bool,
}

#[derive(Debug, Clone)]
pub enum Region {
    Paragraph(Paragraph),
    Table(Table),
    ListItem(ListItem),
}

/// Partition the document's main content into regions, in document order.
///
/// Works on a pruned view: noise subtrees (table of contents, citation
/// markers, nav/info boxes, nav/aside/footer, category links) are skipped
/// during traversal instead of being removed from the tree, so the parsed
/// document is left untouched.
pub fn segment(doc: &RawDocument) -> Vec<Region> {
    let root = content_root(doc.html());
    let mut regions = Vec::new();
    walk(root, false, &mut regions);
    regions
}

/// Every table under the content root, nested ones included.
pub fn all_tables(regions: &[Region]) -> impl Iterator<Item = &Table> {
    regions.iter().filter_map(|r| match r {
        Region::Table(t) => Some(t),
        _ => None,
    })
}

fn content_root(html: &Html) -> ElementRef<'_> {
    CONTENT_SELECTORS
        .iter()
        .find_map(|sel| html.select(sel).next())
        .unwrap_or_else(|| html.root_element())
}

fn walk(el: ElementRef<'_>, in_toc: bool, out: &mut Vec<Region>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        if is_noise(child) {
            continue;
        }
        match child.value().name() {
            "p" => out.push(Region::Paragraph(build_paragraph(child))),
            "table" => out.push(Region::Table(build_table(child))),
            "li" => out.push(Region::ListItem(ListItem {
                text: text_of(child),
                in_toc: in_toc || is_toc(child),
            })),
            _ => {}
        }
        walk(child, in_toc || is_toc(child), out);
    }
}

fn is_noise(el: ElementRef<'_>) -> bool {
    let v = el.value();
    match v.name() {
        "nav" | "aside" | "footer" | "script" | "style" => true,
        "div" => v.id() == Some("toc") || has_class(el, "toc") || has_class(el, "categories"),
        "sup" | "span" => has_class(el, "reference"),
        "table" => v.classes().any(|c| NOISE_TABLE_CLASSES.contains(&c)),
        _ => false,
    }
}

fn is_toc(el: ElementRef<'_>) -> bool {
    let v = el.value();
    v.id() == Some("toc") || v.classes().any(|c| c == "toc" || c.starts_with("toclevel"))
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Visible text: each text node trimmed, empties dropped, joined by spaces.
pub fn text_of(el: ElementRef<'_>) -> String {
    fn collect(el: ElementRef<'_>, out: &mut Vec<String>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    let slice: &str = text;
                    let slice = slice.trim();
                    if !slice.is_empty() {
                        out.push(slice.to_string());
                    }
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        if !is_noise(child_el) {
                            collect(child_el, out);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let mut parts = Vec::new();
    collect(el, &mut parts);
    parts.join(" ")
}

fn build_paragraph(p: ElementRef<'_>) -> Paragraph {
    let mut runs = Vec::new();
    flatten_inline(p, &mut runs);
    Paragraph {
        runs,
        text: text_of(p),
    }
}

/// Direct children become runs. Wrappers that hide a bold span inside them
/// are flattened so the bold span still starts its own run.
fn flatten_inline(el: ElementRef<'_>, runs: &mut Vec<Inline>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let slice: &str = text;
                runs.push(Inline::Text(slice.to_string()));
            }
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_noise(child_el) {
                    continue;
                }
                match child_el.value().name() {
                    "b" | "strong" => runs.push(Inline::Bold(text_of(child_el))),
                    "i" | "em" => runs.push(Inline::Italic(text_of(child_el))),
                    "br" => {}
                    _ if contains_bold(child_el) => flatten_inline(child_el, runs),
                    _ => runs.push(Inline::Other(text_of(child_el))),
                }
            }
            _ => {}
        }
    }
}

fn contains_bold(el: ElementRef<'_>) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| matches!(e.value().name(), "b" | "strong"))
}

fn build_table(table: ElementRef<'_>) -> Table {
    fn collect(el: ElementRef<'_>, cells: &mut Vec<TableCell>, labels: &mut Vec<String>) {
        for child in el.children().filter_map(ElementRef::wrap) {
            if is_noise(child) {
                continue;
            }
            match child.value().name() {
                "td" => cells.push(TableCell {
                    text: text_of(child),
                    has_image: contains_image(child),
                }),
                "img" => {
                    if let Some(label) = image_label(child) {
                        labels.push(label);
                    }
                }
                _ => {}
            }
            collect(child, cells, labels);
        }
    }

    let mut cells = Vec::new();
    let mut image_labels = Vec::new();
    collect(table, &mut cells, &mut image_labels);
    Table { cells, image_labels }
}

fn contains_image(el: ElementRef<'_>) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "img")
}

fn image_label(img: ElementRef<'_>) -> Option<String> {
    ["alt", "data-image-name"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DocumentSource;

    fn regions(html: &str) -> Vec<Region> {
        segment(&RawDocument::parse(html, DocumentSource::Local))
    }

    fn paragraph_texts(regions: &[Region]) -> Vec<String> {
        regions
            .iter()
            .filter_map(|r| match r {
                Region::Paragraph(p) => Some(p.text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn prefers_parser_output_container() {
        let html = r#"<html><body>
            <p>Outside the content</p>
            <div id="mw-content-text"><div class="mw-parser-output"><p>Inside</p></div></div>
        </body></html>"#;
        assert_eq!(paragraph_texts(&regions(html)), vec!["Inside"]);
    }

    #[test]
    fn falls_back_to_body() {
        let html = "<html><body><p>First</p><div><p>Second</p></div></body></html>";
        assert_eq!(paragraph_texts(&regions(html)), vec!["First", "Second"]);
    }

    #[test]
    fn prunes_noise_subtrees() {
        let html = r#"<div class="mw-parser-output">
            <div id="toc"><ul><li>1 Transcript</li></ul></div>
            <p>Leafy: Hello<sup class="reference">[1]</sup> there</p>
            <table class="navbox"><tr><td><p>Nav text</p></td></tr></table>
            <nav><p>Menu</p></nav>
            <div class="categories"><p>Category: Transcripts</p></div>
            <table><tr><td>kept</td></tr></table>
        </div>"#;
        let rs = regions(html);
        assert_eq!(paragraph_texts(&rs), vec!["Leafy: Hello there"]);
        assert!(!rs.iter().any(|r| matches!(r, Region::ListItem(_))));
        let tables: Vec<_> = all_tables(&rs).collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].cells[0].text, "kept");
    }

    #[test]
    fn paragraph_runs_split_on_formatting() {
        let rs = regions("<body><p><b>Four</b>: Go away. <i>(walks off)</i></p></body>");
        let Region::Paragraph(p) = &rs[0] else { panic!("expected paragraph") };
        assert_eq!(
            p.runs,
            vec![
                Inline::Bold("Four".into()),
                Inline::Text(": Go away. ".into()),
                Inline::Italic("(walks off)".into()),
            ]
        );
        assert_eq!(p.text, "Four : Go away. (walks off)");
    }

    #[test]
    fn wrapped_bold_is_flattened() {
        let rs = regions(r#"<body><p><span class="x"><b>Pin</b>: Hi!</span> <a href="/w">link</a></p></body>"#);
        let Region::Paragraph(p) = &rs[0] else { panic!("expected paragraph") };
        assert_eq!(p.runs[0], Inline::Bold("Pin".into()));
        assert_eq!(p.runs.last(), Some(&Inline::Other("link".into())));
    }

    #[test]
    fn tables_collect_cells_and_labels() {
        let html = r#"<body><table>
            <tr><td><img alt="" data-image-name="Leafy Icon.png"></td><td>I don't think so.</td></tr>
            <tr><td><table><tr><td><img alt="Pin"></td><td>Inner</td></tr></table></td></tr>
        </table></body>"#;
        let rs = regions(html);
        let tables: Vec<_> = all_tables(&rs).collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].image_labels, vec!["Pin"]);
        assert_eq!(tables[1].cells[1].text, "Inner");
        assert_eq!(tables[0].image_labels, vec!["Leafy Icon.png", "Pin"]);
        assert!(tables[0].cells[0].has_image);
        assert_eq!(tables[0].cells[1].text, "I don't think so.");
    }

    #[test]
    fn list_items_inside_toc_lists_are_flagged() {
        let html = r#"<body><ul class="toc"><li>Intro</li></ul><ul><li>Coiny: Hey!</li></ul></body>"#;
        let items: Vec<_> = regions(html)
            .into_iter()
            .filter_map(|r| match r {
                Region::ListItem(li) => Some(li),
                _ => None,
            })
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].in_toc);
        assert!(!items[1].in_toc);
    }

    #[test]
    fn segmenting_twice_gives_same_regions() {
        let doc = RawDocument::parse("<body><p><b>Pen</b>: Hi.</p><table><tr><td>x</td></tr></table></body>", DocumentSource::Local);
        let a = format!("{:?}", segment(&doc));
        let b = format!("{:?}", segment(&doc));
        assert_eq!(a, b);
    }
}
