//! Change subscriptions between portfolio entities.
//!
//! A directed graph with one node per entity that takes part in a link.
//! Edges run from the source (the entity whose value changes) to the
//! subscriber (the entity that must recompute), labelled by which input of
//! the subscriber the source feeds.

use crate::id::EntityId;
use crate::style::Side;
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Which input of the subscriber a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    /// Color → color it is based on.
    Base,
    /// Color → gradient with at least one stop tracking it.
    GradientStop,
    /// Color → style side paint color.
    Color(Side),
    /// Gradient → style side shader.
    Gradient(Side),
    /// Color → style side shadow tint.
    ShadowColor(Side),
}

#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    graph: StableDiGraph<EntityId, Link>,
    index: HashMap<EntityId, NodeIndex>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: EntityId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id);
        self.index.insert(id, idx);
        idx
    }

    /// Route `source` changes to `subscriber`. Repeated calls are no-ops.
    pub fn subscribe(&mut self, source: EntityId, subscriber: EntityId, link: Link) {
        let from = self.node(source);
        let to = self.node(subscriber);
        if self.find_edge(from, to, link).is_none() {
            log::trace!("subscribe {subscriber} to {source} ({link:?})");
            self.graph.add_edge(from, to, link);
        }
    }

    pub fn unsubscribe(&mut self, source: EntityId, subscriber: EntityId, link: Link) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(&source), self.index.get(&subscriber))
        else {
            return false;
        };
        match self.find_edge(from, to, link) {
            Some(edge) => {
                log::trace!("unsubscribe {subscriber} from {source} ({link:?})");
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    fn find_edge(&self, from: NodeIndex, to: NodeIndex, link: Link) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .find(|edge| edge.target() == to && *edge.weight() == link)
            .map(|edge| edge.id())
    }

    /// Move one input of `subscriber` from `old` to `new`: unsubscribe the
    /// old source first, then subscribe the new one.
    pub fn rebind(
        &mut self,
        subscriber: EntityId,
        link: Link,
        old: Option<EntityId>,
        new: Option<EntityId>,
    ) {
        if let Some(old) = old {
            self.unsubscribe(old, subscriber, link);
        }
        if let Some(new) = new {
            self.subscribe(new, subscriber, link);
        }
    }

    /// Subscribers of `source` in subscription order.
    pub fn subscribers(&self, source: EntityId) -> Vec<(EntityId, Link)> {
        self.neighbors(source, Direction::Outgoing)
    }

    /// Sources `subscriber` listens to, in subscription order.
    pub fn sources(&self, subscriber: EntityId) -> Vec<(EntityId, Link)> {
        self.neighbors(subscriber, Direction::Incoming)
    }

    fn neighbors(&self, id: EntityId, direction: Direction) -> Vec<(EntityId, Link)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge.id())?;
                let other = match direction {
                    Direction::Outgoing => to,
                    Direction::Incoming => from,
                };
                Some((edge.id(), self.graph[other], *edge.weight()))
            })
            .collect();
        edges.sort_by_key(|(edge, _, _)| *edge);
        edges.into_iter().map(|(_, id, link)| (id, link)).collect()
    }

    /// Drop `id` together with every subscription in or out of it.
    pub fn remove(&mut self, id: EntityId) {
        if let Some(idx) = self.index.remove(&id) {
            self.graph.remove_node(idx);
        }
    }

    /// Whether a change on `from` can reach `to`.
    pub fn reaches(&self, from: EntityId, to: EntityId) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => from == to,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Every subscription as `(source, subscriber, link)`.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, EntityId, Link)> + '_ {
        self.graph.edge_indices().filter_map(|edge| {
            let (from, to) = self.graph.edge_endpoints(edge)?;
            Some((self.graph[from], self.graph[to], self.graph[edge]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids() -> (EntityId, EntityId, EntityId) {
        (
            EntityId::intern("links-a"),
            EntityId::intern("links-b"),
            EntityId::intern("links-c"),
        )
    }

    #[test]
    fn subscribe_is_idempotent() {
        let (a, b, _) = ids();
        let mut subs = Subscriptions::new();
        subs.subscribe(a, b, Link::Base);
        subs.subscribe(a, b, Link::Base);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs.subscribers(a), vec![(b, Link::Base)]);
        assert_eq!(subs.sources(b), vec![(a, Link::Base)]);
    }

    #[test]
    fn rebind_moves_the_subscription() {
        let (a, b, c) = ids();
        let mut subs = Subscriptions::new();
        subs.rebind(c, Link::Color(Side::Fill), None, Some(a));
        subs.rebind(c, Link::Color(Side::Fill), Some(a), Some(b));
        assert!(subs.subscribers(a).is_empty());
        assert_eq!(subs.subscribers(b), vec![(c, Link::Color(Side::Fill))]);
    }

    #[test]
    fn same_pair_can_carry_several_links() {
        let (a, _, c) = ids();
        let mut subs = Subscriptions::new();
        subs.subscribe(a, c, Link::Color(Side::Fill));
        subs.subscribe(a, c, Link::ShadowColor(Side::Frame));
        assert!(subs.unsubscribe(a, c, Link::Color(Side::Fill)));
        assert_eq!(subs.subscribers(a), vec![(c, Link::ShadowColor(Side::Frame))]);
    }

    #[test]
    fn reachability_follows_chains() {
        let (a, b, c) = ids();
        let mut subs = Subscriptions::new();
        subs.subscribe(a, b, Link::Base);
        subs.subscribe(b, c, Link::Base);
        assert!(subs.reaches(a, c));
        assert!(!subs.reaches(c, a));
        subs.remove(b);
        assert!(!subs.reaches(a, c));
        assert!(subs.is_empty());
    }
}
