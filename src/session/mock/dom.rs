//! In-memory DOM for the mock session

use crate::locator::Locator;
use crate::session::mock::selector;
use crate::session::traits::{BoundingBox, DialogInfo, DialogKind};
use crate::{Error, Result};

/// Declarative element description used to build mock pages
///
/// ```rust
/// use chaser_actions::session::mock::MockNode;
///
/// let form = MockNode::new("form")
///     .child(MockNode::new("input").id("q").attr("name", "q"))
///     .child(MockNode::new("button").id("go").text("Search"));
/// ```
#[derive(Debug, Clone)]
pub struct MockNode {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    displayed: bool,
    enabled: bool,
    selected: bool,
    bbox: Option<BoundingBox>,
    on_click_dialog: Option<DialogInfo>,
    children: Vec<MockNode>,
    frame_content: Option<Vec<MockNode>>,
}

impl MockNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            attrs: Vec::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            selected: false,
            bbox: None,
            on_click_dialog: None,
            children: Vec::new(),
            frame_content: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.attrs.retain(|(existing, _)| *existing != name);
        self.attrs.push((name, value.into()));
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Checked checkbox/radio or selected option
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Layout box; elements without one get a default box
    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bbox = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Clicking the element opens a JavaScript dialog
    pub fn opens_dialog(mut self, kind: DialogKind, message: impl Into<String>) -> Self {
        self.on_click_dialog = Some(DialogInfo {
            kind,
            message: message.into(),
            default_prompt: None,
        });
        self
    }

    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MockNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Document loaded in this `<iframe>`
    pub fn frame_content(mut self, content: impl IntoIterator<Item = MockNode>) -> Self {
        self.frame_content = Some(content.into_iter().collect());
        self
    }
}

pub(crate) const DOCUMENT: &str = "#document";

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
    /// Live `value` property of form controls
    pub value: Option<String>,
    pub bbox: BoundingBox,
    pub on_click_dialog: Option<DialogInfo>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub connected: bool,
    /// Document root of an iframe's content
    pub frame_doc: Option<usize>,
}

/// Arena of nodes; index 0 is the top-level document
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<NodeData>,
}

impl Dom {
    pub fn new(content: Vec<MockNode>) -> Self {
        let mut dom = Self { nodes: Vec::new() };
        let root = dom.new_document();
        for node in content {
            dom.append(root, node);
        }
        dom
    }

    fn new_document(&mut self) -> usize {
        self.push(NodeData {
            tag: DOCUMENT.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            selected: false,
            value: None,
            bbox: BoundingBox { x: 0.0, y: 0.0, width: 1280.0, height: 720.0 },
            on_click_dialog: None,
            parent: None,
            children: Vec::new(),
            connected: true,
            frame_doc: None,
        })
    }

    fn push(&mut self, data: NodeData) -> usize {
        self.nodes.push(data);
        self.nodes.len() - 1
    }

    /// Build `node` under `parent` and return its index
    pub fn append(&mut self, parent: usize, node: MockNode) -> usize {
        let index = self.nodes.len();
        let value = node
            .attrs
            .iter()
            .find(|(name, _)| name == "value")
            .map(|(_, value)| value.clone())
            .or_else(|| matches!(node.tag.as_str(), "input" | "textarea").then(String::new));

        let frame_doc = node.frame_content.map(|content| {
            let doc = self.new_document();
            for child in content {
                self.append(doc, child);
            }
            doc
        });

        let data = NodeData {
            tag: node.tag,
            attrs: node.attrs,
            text: node.text,
            displayed: node.displayed,
            enabled: node.enabled,
            selected: node.selected,
            value,
            bbox: node.bbox.unwrap_or(BoundingBox {
                x: 8.0,
                y: 8.0 + 24.0 * index as f64,
                width: 120.0,
                height: 20.0,
            }),
            on_click_dialog: node.on_click_dialog,
            parent: Some(parent),
            children: Vec::new(),
            connected: true,
            frame_doc,
        };
        let index = self.push(data);
        self.nodes[parent].children.push(index);

        for child in node.children {
            self.append(index, child);
        }
        index
    }

    pub fn node(&self, index: usize) -> Result<&NodeData> {
        match self.nodes.get(index) {
            Some(node) if node.connected => Ok(node),
            _ => Err(Error::stale_element(format!("node-{}", index))),
        }
    }

    pub fn node_mut(&mut self, index: usize) -> Result<&mut NodeData> {
        match self.nodes.get_mut(index) {
            Some(node) if node.connected => Ok(node),
            _ => Err(Error::stale_element(format!("node-{}", index))),
        }
    }

    pub fn tag(&self, index: usize) -> &str {
        &self.nodes[index].tag
    }

    pub fn attr(&self, index: usize, name: &str) -> Option<&str> {
        self.nodes[index]
            .attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes[index].parent
    }

    pub fn child_nodes(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }

    /// Document root the node belongs to
    pub fn document_of(&self, mut index: usize) -> usize {
        while let Some(parent) = self.nodes[index].parent {
            index = parent;
        }
        index
    }

    /// Descendants in document order, not entering frames
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    /// Own text only, as XPath `text()` sees it
    pub fn text_of(&self, index: usize) -> String {
        self.nodes[index].text.clone()
    }

    /// Own text followed by descendant text
    pub fn text_content(&self, index: usize) -> String {
        let mut text = self.nodes[index].text.clone();
        for child in self.descendants(index) {
            text.push_str(&self.nodes[child].text);
        }
        text
    }

    /// Displayed itself and through every ancestor
    pub fn is_displayed(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(node) = current {
            if !self.nodes[node].displayed {
                return false;
            }
            current = self.nodes[node].parent;
        }
        true
    }

    /// Rendered text: empty for hidden elements
    pub fn rendered_text(&self, index: usize) -> String {
        if !self.is_displayed(index) {
            return String::new();
        }
        let mut text = self.nodes[index].text.clone();
        for child in self.descendants(index) {
            if self.is_displayed(child) {
                text.push_str(&self.nodes[child].text);
            }
        }
        text
    }

    /// Elements under `root` matching `locator`, in document order
    pub fn query(&self, root: usize, locator: &Locator) -> Result<Vec<usize>> {
        self.node(root)?;
        let candidates = self.descendants(root);
        let matches = match locator {
            Locator::Id(id) => candidates
                .into_iter()
                .filter(|&n| self.attr(n, "id") == Some(id.as_str()))
                .collect(),
            Locator::Name(name) => candidates
                .into_iter()
                .filter(|&n| self.attr(n, "name") == Some(name.as_str()))
                .collect(),
            Locator::ClassName(class) => {
                if class.split_whitespace().count() != 1 {
                    return Err(Error::invalid_selector(format!("Compound class names not permitted: {}", class)));
                }
                candidates
                    .into_iter()
                    .filter(|&n| self.has_class(n, class))
                    .collect()
            }
            Locator::TagName(tag) => {
                let tag = tag.to_lowercase();
                candidates.into_iter().filter(|&n| self.tag(n) == tag).collect()
            }
            Locator::LinkText(text) => candidates
                .into_iter()
                .filter(|&n| self.tag(n) == "a" && self.rendered_text(n).trim() == text)
                .collect(),
            Locator::PartialLinkText(text) => candidates
                .into_iter()
                .filter(|&n| self.tag(n) == "a" && self.rendered_text(n).contains(text.as_str()))
                .collect(),
            Locator::Css(css) => {
                let selector = selector::CssSelector::parse(css)?;
                candidates
                    .into_iter()
                    .filter(|&n| selector.matches(self, n))
                    .collect()
            }
            Locator::XPath(xpath) => selector::XPath::parse(xpath)?.evaluate(self, root),
        };
        Ok(matches)
    }

    pub fn has_class(&self, index: usize, class: &str) -> bool {
        self.attr(index, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Frames of a document, in document order
    pub fn frames_in(&self, doc: usize) -> Vec<usize> {
        self.descendants(doc)
            .into_iter()
            .filter(|&n| matches!(self.tag(n), "iframe" | "frame"))
            .collect()
    }

    /// Detach the node and its subtree
    pub fn remove(&mut self, index: usize) {
        if let Some(parent) = self.nodes[index].parent.take() {
            self.nodes[parent].children.retain(|&child| child != index);
        }
        let mut stack = vec![index];
        while let Some(next) = stack.pop() {
            self.nodes[next].connected = false;
            stack.extend(self.nodes[next].children.iter().copied());
            stack.extend(self.nodes[next].frame_doc);
        }
    }

    pub fn set_attr(&mut self, index: usize, name: &str, value: &str) {
        let node = &mut self.nodes[index];
        match node.attrs.iter_mut().find(|(attr, _)| attr == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => node.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Short label for action logs: `tag#id`, `tag.class` or `tag`
    pub fn label(&self, index: usize) -> String {
        let tag = self.tag(index);
        if let Some(id) = self.attr(index, "id") {
            format!("{}#{}", tag, id)
        } else if let Some(class) = self.attr(index, "class").and_then(|c| c.split_whitespace().next()) {
            format!("{}.{}", tag, class)
        } else {
            tag.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dom {
        Dom::new(vec![MockNode::new("div")
            .id("main")
            .class("box primary")
            .child(MockNode::new("a").attr("href", "/next").text("Next page"))
            .child(MockNode::new("span").text("hidden").hidden())
            .child(MockNode::new("input").attr("name", "q"))])
    }

    #[test]
    fn test_query_by_simple_strategies() {
        let dom = sample();
        assert_eq!(dom.query(0, &Locator::id("main")).unwrap().len(), 1);
        assert_eq!(dom.query(0, &Locator::class_name("primary")).unwrap().len(), 1);
        assert_eq!(dom.query(0, &Locator::name("q")).unwrap().len(), 1);
        assert_eq!(dom.query(0, &Locator::tag_name("A")).unwrap().len(), 1);
        assert_eq!(dom.query(0, &Locator::link_text("Next page")).unwrap().len(), 1);
        assert_eq!(dom.query(0, &Locator::partial_link_text("Next")).unwrap().len(), 1);
        assert!(dom.query(0, &Locator::link_text("Next")).unwrap().is_empty());
    }

    #[test]
    fn test_compound_class_name_is_invalid() {
        let dom = sample();
        assert!(matches!(
            dom.query(0, &Locator::class_name("box primary")),
            Err(Error::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let dom = sample();
        let tags: Vec<&str> = dom.descendants(0).into_iter().map(|n| dom.tag(n)).collect();
        assert_eq!(tags, vec!["div", "a", "span", "input"]);
    }

    #[test]
    fn test_removed_nodes_are_stale() {
        let mut dom = sample();
        let main = dom.query(0, &Locator::id("main")).unwrap()[0];
        let link = dom.query(0, &Locator::tag_name("a")).unwrap()[0];
        dom.remove(main);

        assert!(matches!(dom.node(link), Err(Error::StaleElement(_))));
        assert!(dom.query(0, &Locator::tag_name("a")).unwrap().is_empty());
    }

    #[test]
    fn test_rendered_text_skips_hidden() {
        let dom = sample();
        let main = dom.query(0, &Locator::id("main")).unwrap()[0];
        assert_eq!(dom.rendered_text(main), "Next page");
        assert_eq!(dom.text_content(main), "Next pagehidden");
    }

    #[test]
    fn test_input_value_defaults() {
        let dom = sample();
        let input = dom.query(0, &Locator::name("q")).unwrap()[0];
        assert_eq!(dom.node(input).unwrap().value.as_deref(), Some(""));
        assert_eq!(dom.label(input), "input");
    }
}
