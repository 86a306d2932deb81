//! XML utility functions for navigating upstream result sets.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use samples_oai::xml::find_child;
///
/// let xml = r#"<ROW><IGSN>AU240</IGSN><REMARK/></ROW>"#;
/// let doc = Document::parse(xml).unwrap();
/// let row = doc.root_element();
///
/// assert!(find_child(row, "IGSN").is_some());
/// assert!(find_child(row, "COUNTRY").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find a descendant element matching a path of tag names.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use samples_oai::xml::find_by_path;
///
/// let xml = r#"<ROW><GEOM><SDO_POINT><X>135.1</X></SDO_POINT></GEOM></ROW>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let x = find_by_path(doc.root_element(), "GEOM/SDO_POINT/X");
/// assert_eq!(x.and_then(|n| n.text()), Some("135.1"));
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;
    for part in path.split('/') {
        current = find_child(current, part)?;
    }
    Some(current)
}

/// Trimmed text of a node, `None` when absent or blank.
pub fn non_empty_text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Trimmed, non-blank text of the element at `path` below `node`.
pub fn text_at(node: Node<'_, '_>, path: &str) -> Option<String> {
    find_by_path(node, path).and_then(non_empty_text)
}

/// All descendant elements with the given tag name, in document order.
pub fn descendants_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants()
        .filter(move |n| n.is_element() && get_tag_name(*n) == tag)
}
