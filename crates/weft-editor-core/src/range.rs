//! Boundary points and ranges over a [`Dom`].
//!
//! Offsets follow the browser convention: a char offset inside text nodes,
//! a child index inside anything else.

use std::cmp::Ordering;

use crate::dom::{Dom, NodeId};

/// A boundary point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Point immediately before `node` in its parent.
    pub fn before(dom: &Dom, node: NodeId) -> Option<Self> {
        Some(Self::new(dom.parent(node)?, dom.index_of(node)?))
    }

    /// Point immediately after `node` in its parent.
    pub fn after(dom: &Dom, node: NodeId) -> Option<Self> {
        Some(Self::new(dom.parent(node)?, dom.index_of(node)? + 1))
    }

    /// Child-index path used to order points in document order.
    ///
    /// A point in a text node sorts as if it were a child position of that
    /// node, which keeps it after the point before the text node and before
    /// the point after it.
    fn boundary_path(&self, dom: &Dom) -> Vec<usize> {
        let mut path = dom.path(self.node);
        path.push(self.offset);
        path
    }

    pub fn cmp_in(&self, dom: &Dom, other: &DomPoint) -> Ordering {
        let a = self.boundary_path(dom);
        let b = other.boundary_path(dom);
        a.cmp(&b)
    }
}

/// A start/end pair of boundary points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomRange {
    pub start: DomPoint,
    pub end: DomPoint,
}

impl DomRange {
    pub fn new(start: DomPoint, end: DomPoint) -> Self {
        Self { start, end }
    }

    pub fn collapsed_at(point: DomPoint) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn set_start(&mut self, node: NodeId, offset: usize) {
        self.start = DomPoint::new(node, offset);
    }

    pub fn set_end(&mut self, node: NodeId, offset: usize) {
        self.end = DomPoint::new(node, offset);
    }

    pub fn set_start_before(&mut self, dom: &Dom, node: NodeId) {
        if let Some(point) = DomPoint::before(dom, node) {
            self.start = point;
        }
    }

    pub fn set_start_after(&mut self, dom: &Dom, node: NodeId) {
        if let Some(point) = DomPoint::after(dom, node) {
            self.start = point;
        }
    }

    pub fn set_end_before(&mut self, dom: &Dom, node: NodeId) {
        if let Some(point) = DomPoint::before(dom, node) {
            self.end = point;
        }
    }

    pub fn set_end_after(&mut self, dom: &Dom, node: NodeId) {
        if let Some(point) = DomPoint::after(dom, node) {
            self.end = point;
        }
    }

    /// Collapse onto the start (`true`) or the end.
    pub fn collapse(&mut self, to_start: bool) {
        if to_start {
            self.end = self.start;
        } else {
            self.start = self.end;
        }
    }

    /// Range spanning exactly `node` within its parent.
    pub fn select_node(dom: &Dom, node: NodeId) -> Option<Self> {
        Some(Self::new(DomPoint::before(dom, node)?, DomPoint::after(dom, node)?))
    }

    /// Range spanning the contents of `node`.
    pub fn select_contents(dom: &Dom, node: NodeId) -> Self {
        Self::new(DomPoint::new(node, 0), DomPoint::new(node, dom.node_len(node)))
    }

    /// Deepest node containing both boundary points.
    pub fn common_ancestor(&self, dom: &Dom) -> Option<NodeId> {
        dom.closest(self.start.node, |node| dom.contains(node, self.end.node))
    }

    /// Whether `node` lies entirely between the boundary points.
    pub fn contains_node(&self, dom: &Dom, node: NodeId) -> bool {
        let (Some(before), Some(after)) = (DomPoint::before(dom, node), DomPoint::after(dom, node))
        else {
            return false;
        };
        self.start.cmp_in(dom, &before) != Ordering::Greater
            && after.cmp_in(dom, &self.end) != Ordering::Greater
    }

    /// Elements touched by the range: the elements holding a text boundary
    /// point and the top-most elements wholly inside, in document order.
    pub fn find_elements_in_simple_range(&self, dom: &Dom) -> Vec<NodeId> {
        let Some(ancestor) = self.common_ancestor(dom) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let push = |node: NodeId, out: &mut Vec<NodeId>| {
            if dom.is_element(node) && !out.contains(&node) {
                out.push(node);
            }
        };
        for point in [self.start, self.end] {
            if dom.is_text(point.node)
                && let Some(parent) = dom.parent(point.node)
            {
                push(parent, &mut out);
            }
        }
        for node in dom.descendants(ancestor) {
            let parent_inside = dom
                .parent(node)
                .is_some_and(|parent| self.contains_node(dom, parent));
            if !parent_inside && self.contains_node(dom, node) {
                push(node, &mut out);
            }
        }
        out.sort_by_key(|node| dom.path(*node));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(html: &str) -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        dom.append_child(dom.body(), root);
        dom.set_inner_html(root, html);
        (dom, root)
    }

    #[test]
    fn test_point_ordering() {
        let (dom, root) = setup("<p>ab</p><p>cd</p>");
        let first_text = dom.first_child(dom.children(root)[0]).unwrap();
        let second_text = dom.first_child(dom.children(root)[1]).unwrap();
        let a = DomPoint::new(first_text, 2);
        let b = DomPoint::new(second_text, 0);
        assert_eq!(a.cmp_in(&dom, &b), Ordering::Less);
        let before_first = DomPoint::new(root, 0);
        assert_eq!(before_first.cmp_in(&dom, &a), Ordering::Less);
        let after_first = DomPoint::new(root, 1);
        assert_eq!(a.cmp_in(&dom, &after_first), Ordering::Less);
    }

    #[test]
    fn test_select_node_and_collapse() {
        let (dom, root) = setup("<p>a</p><hr><p>b</p>");
        let hr = dom.children(root)[1];
        let mut range = DomRange::select_node(&dom, hr).unwrap();
        assert_eq!(range.start, DomPoint::new(root, 1));
        assert_eq!(range.end, DomPoint::new(root, 2));
        assert!(!range.is_collapsed());
        range.collapse(false);
        assert_eq!(range.start, DomPoint::new(root, 2));
        assert!(range.is_collapsed());
    }

    #[test]
    fn test_common_ancestor() {
        let (dom, root) = setup("<p><b>a</b><i>b</i></p>");
        let p = dom.first_child(root).unwrap();
        let a = dom.first_child(dom.children(p)[0]).unwrap();
        let b = dom.first_child(dom.children(p)[1]).unwrap();
        let range = DomRange::new(DomPoint::new(a, 0), DomPoint::new(b, 1));
        assert_eq!(range.common_ancestor(&dom), Some(p));
    }

    #[test]
    fn test_find_elements_in_simple_range() {
        let (dom, root) = setup("<p>a</p><p>b</p><p>c</p>");
        let [p1, p2, p3] = [dom.children(root)[0], dom.children(root)[1], dom.children(root)[2]];
        let a = dom.first_child(p1).unwrap();
        let c = dom.first_child(p3).unwrap();
        let range = DomRange::new(DomPoint::new(a, 0), DomPoint::new(c, 1));
        assert_eq!(range.find_elements_in_simple_range(&dom), vec![p1, p2, p3]);

        let collapsed = DomRange::collapsed_at(DomPoint::new(a, 1));
        assert_eq!(collapsed.find_elements_in_simple_range(&dom), vec![p1]);

        let whole = DomRange::select_node(&dom, p2).unwrap();
        assert_eq!(whole.find_elements_in_simple_range(&dom), vec![p2]);
    }
}
