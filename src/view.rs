//! Declarative view tree with positional diffing.
//!
//! Renderers build a fresh `Node` tree from the current snapshot every time.
//! A `Region` keeps the previously rendered tree and reports only the
//! `Patch`es needed to turn it into the new one; applying those patches to
//! the old tree yields a tree equal to the new one.

use thiserror::Error;

const VOID_TAGS: [&str; 5] = ["br", "hr", "img", "input", "meta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Element(element) => {
                out.push('<');
                out.push_str(element.tag);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&element.tag) {
                    return;
                }
                for child in &element.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(element.tag);
                out.push('>');
            }
        }
    }

    /// Concatenated text content, handy for assertions and plain output.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Element(element) => element.children.iter().map(Node::text_content).collect(),
        }
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
        match self {
            Node::Element(element) => element.children.get_mut(index),
            Node::Text(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn id(self, value: impl Into<String>) -> Self {
        self.attr("id", value)
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }
}

/// Child-index path from the region root.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    Replace { path: NodePath, node: Node },
    SetText { path: NodePath, text: String },
    SetAttrs {
        path: NodePath,
        attrs: Vec<(&'static str, String)>,
    },
    Append { path: NodePath, node: Node },
    Truncate { path: NodePath, len: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("patch target {path:?} does not exist")]
pub struct PatchError {
    pub path: NodePath,
}

pub fn diff(old: &Node, new: &Node) -> Vec<Patch> {
    let mut patches = Vec::new();
    let mut path = Vec::new();
    diff_into(old, new, &mut path, &mut patches);
    patches
}

fn diff_into(old: &Node, new: &Node, path: &mut NodePath, patches: &mut Vec<Patch>) {
    match (old, new) {
        (Node::Text(before), Node::Text(after)) => {
            if before != after {
                patches.push(Patch::SetText {
                    path: path.clone(),
                    text: after.clone(),
                });
            }
        }
        (Node::Element(before), Node::Element(after)) if before.tag == after.tag => {
            if before.attrs != after.attrs {
                patches.push(Patch::SetAttrs {
                    path: path.clone(),
                    attrs: after.attrs.clone(),
                });
            }
            let shared = before.children.len().min(after.children.len());
            for index in 0..shared {
                path.push(index);
                diff_into(&before.children[index], &after.children[index], path, patches);
                path.pop();
            }
            if after.children.len() < before.children.len() {
                patches.push(Patch::Truncate {
                    path: path.clone(),
                    len: after.children.len(),
                });
            }
            for extra in &after.children[shared..] {
                patches.push(Patch::Append {
                    path: path.clone(),
                    node: extra.clone(),
                });
            }
        }
        _ => patches.push(Patch::Replace {
            path: path.clone(),
            node: new.clone(),
        }),
    }
}

pub fn apply(root: &mut Node, patches: &[Patch]) -> Result<(), PatchError> {
    for patch in patches {
        match patch {
            Patch::Replace { path, node } => *resolve(root, path)? = node.clone(),
            Patch::SetText { path, text } => match resolve(root, path)? {
                Node::Text(current) => *current = text.clone(),
                Node::Element(_) => return Err(PatchError { path: path.clone() }),
            },
            Patch::SetAttrs { path, attrs } => element_at(root, path)?.attrs = attrs.clone(),
            Patch::Append { path, node } => element_at(root, path)?.children.push(node.clone()),
            Patch::Truncate { path, len } => element_at(root, path)?.children.truncate(*len),
        }
    }
    Ok(())
}

fn resolve<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Node, PatchError> {
    let mut node = root;
    for &index in path {
        node = node.child_mut(index).ok_or_else(|| PatchError {
            path: path.to_vec(),
        })?;
    }
    Ok(node)
}

fn element_at<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Element, PatchError> {
    match resolve(root, path)? {
        Node::Element(element) => Ok(element),
        Node::Text(_) => Err(PatchError {
            path: path.to_vec(),
        }),
    }
}

/// A display area that always reflects the latest rendered tree.
#[derive(Debug, Clone, Default)]
pub struct Region {
    current: Option<Node>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in `next` and returns the patches from the previous tree. The
    /// first render is a single root replacement.
    pub fn update(&mut self, next: Node) -> Vec<Patch> {
        let patches = match &self.current {
            Some(previous) => diff(previous, &next),
            None => vec![Patch::Replace {
                path: Vec::new(),
                node: next.clone(),
            }],
        };
        self.current = Some(next);
        patches
    }

    pub fn html(&self) -> String {
        self.current.as_ref().map(Node::to_html).unwrap_or_default()
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
