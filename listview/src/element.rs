//! A retained element arena standing in for the document surface.
//!
//! The engine owns placement and lifecycle of the elements it creates (surface, group
//! containers, blocks, item containers, item boxes). Rendered item and header content is created
//! by the host's renderer inside the same arena; the engine only attaches, positions and detaches
//! it.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::{Bounds, Size};

new_key_type! {
    /// Handle of an element in an [`ElementTree`].
    pub struct ElementId;
}

/// Class names the engine puts on its own elements.
pub mod classes {
    pub const SURFACE: &str = "lv-surface";
    pub const GROUP: &str = "lv-group";
    pub const HEADER_CONTAINER: &str = "lv-headercontainer";
    pub const ITEMS_CONTAINER: &str = "lv-itemscontainer";
    pub const BLOCK: &str = "lv-itemsblock";
    pub const CONTAINER: &str = "lv-container";
    pub const ITEM_BOX: &str = "lv-itembox";
    pub const ITEM: &str = "lv-item";
    pub const HEADER: &str = "lv-groupheader";
    pub const MEASURING: &str = "lv-measuring";
}

pub type ClassName = Cow<'static, str>;

#[derive(Clone, Debug)]
pub struct Element {
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    classes: SmallVec<[ClassName; 4]>,
    attributes: BTreeMap<ClassName, String>,
    bounds: Option<Bounds>,
    content_size: Option<Size>,
    opacity: f32,
    translation: (i64, i64),
    hidden: bool,
}

impl Element {
    fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            classes: SmallVec::new(),
            attributes: BTreeMap::new(),
            bounds: None,
            content_size: None,
            opacity: 1.0,
            translation: (0, 0),
            hidden: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ElementTree {
    nodes: SlotMap<ElementId, Element>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element with the given classes.
    pub fn create(&mut self, class_names: &[&'static str]) -> ElementId {
        let mut el = Element::new();
        el.classes
            .extend(class_names.iter().map(|c| Cow::Borrowed(*c)));
        self.nodes.insert(el)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes `id` and its whole subtree.
    pub fn remove(&mut self, id: ElementId) {
        if !self.nodes.contains_key(id) {
            return;
        }
        self.detach(id);
        let mut stack = alloc::vec![id];
        while let Some(next) = stack.pop() {
            if let Some(el) = self.nodes.remove(next) {
                stack.extend(el.children);
            }
        }
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(id).and_then(|el| el.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(id)
            .map(|el| el.children.as_slice())
            .unwrap_or(&[])
    }

    /// Appends `child` to `parent`, detaching it from its previous parent first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    pub fn insert_child(&mut self, parent: ElementId, index: usize, child: ElementId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            debug_assert!(parent != child, "element cannot be its own child");
            return;
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Detaches `id` from its parent; the element stays alive.
    pub fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(el) = self.nodes.get_mut(id) {
            el.parent = None;
        }
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.parent(id).is_some()
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: ElementId, ancestor: ElementId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Iterates `id` and then its ancestors up to the root.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.contains(id).then_some(id),
        }
    }

    pub fn add_class(&mut self, id: ElementId, class: impl Into<ClassName>) {
        let class = class.into();
        if let Some(el) = self.nodes.get_mut(id) {
            if !el.classes.iter().any(|c| *c == class) {
                el.classes.push(class);
            }
        }
    }

    pub fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    pub fn classes(&self, id: ElementId) -> impl Iterator<Item = &str> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|el| el.classes.iter().map(|c| c.as_ref()))
    }

    pub fn set_attribute(
        &mut self,
        id: ElementId,
        name: impl Into<ClassName>,
        value: impl Into<String>,
    ) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.attributes.insert(name.into(), value.into());
        }
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.nodes
            .get(id)
            .and_then(|el| el.attributes.get(name))
            .map(String::as_str)
    }

    pub fn remove_attribute(&mut self, id: ElementId, name: &str) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.attributes.remove(name);
        }
    }

    pub fn set_bounds(&mut self, id: ElementId, bounds: Bounds) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.bounds = Some(bounds);
        }
    }

    pub fn clear_bounds(&mut self, id: ElementId) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.bounds = None;
        }
    }

    pub fn bounds(&self, id: ElementId) -> Option<Bounds> {
        self.nodes.get(id).and_then(|el| el.bounds)
    }

    /// Records the intrinsic size of rendered content. Set by renderers (or the host) once the
    /// content can be measured.
    pub fn set_content_size(&mut self, id: ElementId, size: Size) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.content_size = Some(size);
        }
    }

    /// The measurable size of `id`: its own content size, or the first measurable descendant's.
    pub fn content_size(&self, id: ElementId) -> Option<Size> {
        let el = self.nodes.get(id)?;
        if let Some(size) = el.content_size.filter(|s| !s.is_empty()) {
            return Some(size);
        }
        el.children.iter().find_map(|c| self.content_size(*c))
    }

    pub fn set_opacity(&mut self, id: ElementId, opacity: f32) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn opacity(&self, id: ElementId) -> f32 {
        self.nodes.get(id).map(|el| el.opacity).unwrap_or(0.0)
    }

    pub fn set_translation(&mut self, id: ElementId, dx: i64, dy: i64) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.translation = (dx, dy);
        }
    }

    pub fn translation(&self, id: ElementId) -> (i64, i64) {
        self.nodes.get(id).map(|el| el.translation).unwrap_or((0, 0))
    }

    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) {
        if let Some(el) = self.nodes.get_mut(id) {
            el.hidden = hidden;
        }
    }

    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.nodes.get(id).is_some_and(|el| el.hidden)
    }

    /// Depth-first pre-order walk of `root`'s subtree.
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![root];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }
}

pub struct Ancestors<'a> {
    tree: &'a ElementTree,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let cur = self.next?;
        self.next = self.tree.parent(cur);
        Some(cur)
    }
}
