use std::cell::RefCell;
use std::rc::Rc;

use html5ever::{local_name, namespace_url, ns, QualName};
use kuchiki::NodeRef;

use crate::error::HookError;

/// Identity key for registry maps. Stable for as long as something holds the
/// node's `Rc`; every table that keys on this also stores the node.
pub fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as usize
}

pub fn is_element_named(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.name.local.as_ref() == name)
        .unwrap_or(false)
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(str::to_string)
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }
}

/// Nearest preceding sibling that is an element, skipping text and comments.
pub fn previous_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    let mut cursor = node.previous_sibling();
    while let Some(candidate) = cursor {
        if candidate.as_element().is_some() {
            return Some(candidate);
        }
        cursor = candidate.previous_sibling();
    }
    None
}

pub fn parent_element(node: &NodeRef) -> Option<NodeRef> {
    node.parent().filter(|parent| parent.as_element().is_some())
}

pub(crate) fn new_div() -> NodeRef {
    NodeRef::new_element(QualName::new(None, ns!(html), local_name!("div")), Vec::new())
}

/// Format a CSS px length the way the style contract expects: integral
/// values without a fraction, everything else as-is.
pub fn px(value: f64) -> String {
    if value == value.trunc() {
        format!("{}px", value as i64)
    } else {
        format!("{value}px")
    }
}

/// Inline style declarations, parsed from and written back to the `style`
/// attribute. Keeps declaration order; setting an existing property replaces
/// its value in place.
#[derive(Debug, Default)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn read(node: &NodeRef) -> Self {
        Self::parse(&attr(node, "style").unwrap_or_default())
    }

    pub fn parse(text: &str) -> Self {
        let mut declarations = Vec::new();
        for declaration in text.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                let property = property.trim();
                let value = value.trim();
                if !property.is_empty() {
                    declarations.push((property.to_string(), value.to_string()));
                }
            }
        }
        Self { declarations }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        match self.declarations.iter().position(|(name, _)| name == property) {
            Some(index) => self.declarations[index].1 = value,
            None => self.declarations.push((property.to_string(), value)),
        }
    }

    pub fn write(&self, node: &NodeRef) {
        let text = self
            .declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        set_attr(node, "style", &text);
    }
}

pub fn style_get(node: &NodeRef, property: &str) -> Option<String> {
    InlineStyle::read(node).get(property).map(str::to_string)
}

pub fn style_set(node: &NodeRef, declarations: &[(&str, &str)]) {
    let mut style = InlineStyle::read(node);
    for (property, value) in declarations {
        style.set(property, *value);
    }
    style.write(node);
}

/// Structural mutations a rendering framework applies to any node it treats
/// as a container. Implemented by plain nodes and by portals, which forward
/// every operation to their shadow content node.
pub trait Container {
    fn child_nodes(&self) -> Vec<NodeRef>;
    fn append_child(&self, child: NodeRef);
    fn insert_child_before(
        &self,
        child: NodeRef,
        reference: Option<&NodeRef>,
    ) -> Result<(), HookError>;
    fn remove_child(&self, child: &NodeRef) -> Result<(), HookError>;
    /// Splice this container's text: the node's own data when it is a text
    /// node, otherwise the data of its first text child.
    fn replace_data(&self, offset: usize, count: usize, data: &str) -> Result<(), HookError>;
}

impl Container for NodeRef {
    fn child_nodes(&self) -> Vec<NodeRef> {
        self.children().collect()
    }

    fn append_child(&self, child: NodeRef) {
        self.append(child);
    }

    fn insert_child_before(
        &self,
        child: NodeRef,
        reference: Option<&NodeRef>,
    ) -> Result<(), HookError> {
        let Some(reference) = reference else {
            self.append(child);
            return Ok(());
        };
        let parented_here = reference
            .parent()
            .map(|parent| node_key(&parent) == node_key(self))
            .unwrap_or(false);
        if !parented_here {
            return Err(HookError::NotAChild);
        }
        reference.insert_before(child);
        Ok(())
    }

    fn remove_child(&self, child: &NodeRef) -> Result<(), HookError> {
        let parented_here = child
            .parent()
            .map(|parent| node_key(&parent) == node_key(self))
            .unwrap_or(false);
        if !parented_here {
            return Err(HookError::NotAChild);
        }
        child.detach();
        Ok(())
    }

    fn replace_data(&self, offset: usize, count: usize, data: &str) -> Result<(), HookError> {
        if let Some(cell) = self.as_text() {
            return splice(cell, offset, count, data);
        }
        for child in self.children() {
            if let Some(cell) = child.as_text() {
                return splice(cell, offset, count, data);
            }
        }
        Err(HookError::NotAText)
    }
}

// Offsets count chars; an overlong count clamps to the tail, as replaceData
// does.
fn splice(cell: &RefCell<String>, offset: usize, count: usize, data: &str) -> Result<(), HookError> {
    let mut text = cell.borrow_mut();
    let len = text.chars().count();
    if offset > len {
        return Err(HookError::SpliceOutOfRange { offset, len });
    }
    let count = count.min(len - offset);
    let mut next = String::with_capacity(text.len() + data.len());
    next.extend(text.chars().take(offset));
    next.push_str(data);
    next.extend(text.chars().skip(offset + count));
    *text = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use kuchiki::traits::*;

    use super::*;

    fn body_child(html: &str) -> NodeRef {
        let document = kuchiki::parse_html().one(format!("<body>{html}</body>").as_str());
        document
            .select_first("body > *")
            .expect("fixture element")
            .as_node()
            .clone()
    }

    #[test]
    fn formats_px() {
        assert_eq!(px(54.0), "54px");
        assert_eq!(px(-60.0), "-60px");
        assert_eq!(px(12.5), "12.5px");
    }

    #[test]
    fn style_round_trip() {
        let node = body_child(r#"<div style="top: 5px; --x: 1px"></div>"#);
        let mut style = InlineStyle::read(&node);
        assert_eq!(style.get("top"), Some("5px"));
        assert_eq!(style.get("--x"), Some("1px"));
        style.set("top", "9px");
        style.set("left", "3px");
        style.write(&node);
        assert_eq!(attr(&node, "style").as_deref(), Some("top: 9px; --x: 1px; left: 3px"));
    }

    #[test]
    fn skips_text_when_walking_siblings() {
        let parent = body_child("<div><span id=\"a\"></span> text <b id=\"target\"></b></div>");
        let target = parent
            .select_first("#target")
            .expect("target")
            .as_node()
            .clone();
        let previous = previous_element_sibling(&target).expect("element sibling");
        assert_eq!(attr(&previous, "id").as_deref(), Some("a"));
    }

    #[test]
    fn splices_text_child() {
        let node = body_child("<div>hello</div>");
        node.replace_data(1, 3, "ey").expect("splice");
        assert_eq!(node.text_contents(), "heylo");
    }

    #[test]
    fn splice_clamps_count_and_checks_offset() {
        let node = body_child("<div>abc</div>");
        node.replace_data(2, 99, "Z").expect("clamped splice");
        assert_eq!(node.text_contents(), "abZ");
        assert!(matches!(
            node.replace_data(9, 0, "x"),
            Err(HookError::SpliceOutOfRange { offset: 9, len: 3 })
        ));
    }

    #[test]
    fn validates_reference_parent() {
        let parent = body_child("<div><i id=\"x\"></i></div>");
        let stranger = body_child("<p></p>");
        let child = NodeRef::new_text("t");
        assert!(matches!(
            parent.insert_child_before(child, Some(&stranger)),
            Err(HookError::NotAChild)
        ));
    }
}
