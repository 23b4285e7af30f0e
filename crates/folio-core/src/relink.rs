//! Deep clone of a whole portfolio.
//!
//! The clone is built in dependency order: properties, colors, gradients,
//! styles, then sketches. After each collection is copied, every reference
//! held by the copies is resolved against the new collections by identity.
//! A reference with no counterpart aborts the clone with
//! [`FolioError::DanglingReference`].

use crate::error::{EntityKind, FolioError, Result};
use crate::id::EntityId;
use crate::portfolio::Portfolio;
use crate::property::PropertyValue;
use crate::shape::ShapeStyle;
use std::collections::HashSet;

/// One outgoing reference held by a portfolio entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub owner: EntityId,
    pub kind: EntityKind,
    pub target: EntityId,
}

/// Identities present in the clone so far.
#[derive(Default)]
struct Resolver {
    colors: HashSet<EntityId>,
    gradients: HashSet<EntityId>,
    styles: HashSet<EntityId>,
    properties: HashSet<EntityId>,
}

impl Resolver {
    fn resolve(&self, kind: EntityKind, id: EntityId) -> Result<EntityId> {
        let present = match kind {
            EntityKind::Color => &self.colors,
            EntityKind::Gradient => &self.gradients,
            EntityKind::Style => &self.styles,
            EntityKind::Property => &self.properties,
            EntityKind::Shape | EntityKind::Sketch => {
                return Err(FolioError::DanglingReference { kind, id });
            }
        };
        if present.contains(&id) {
            Ok(id)
        } else {
            log::warn!("dangling {kind} reference {id}");
            Err(FolioError::DanglingReference { kind, id })
        }
    }
}

impl Portfolio {
    /// An independent copy with the same identities, kinds and values.
    ///
    /// Mutating either portfolio afterwards never affects the other.
    /// Listeners are not carried over. On error no partial clone escapes.
    pub fn deep_clone(&self) -> Result<Portfolio> {
        let mut clone = Portfolio::empty(self.config.clone());
        clone.id = self.id;
        clone.name = self.name.clone();
        clone.sketch_counter = self.sketch_counter;
        let mut resolver = Resolver::default();

        clone.properties = self.properties.clone();
        resolver.properties = clone.properties.iter().map(|p| p.id).collect();

        clone.colors = self.colors.clone();
        resolver.colors = clone.colors.iter().map(|c| c.id).collect();
        for color in &mut clone.colors {
            if let Some(base) = color.base {
                color.base = Some(resolver.resolve(EntityKind::Color, base)?);
            }
            for connection in color.connections.iter_mut() {
                connection.property = resolver.resolve(EntityKind::Property, connection.property)?;
            }
        }

        clone.gradients = self.gradients.clone();
        resolver.gradients = clone.gradients.iter().map(|g| g.id).collect();
        for gradient in &mut clone.gradients {
            gradient.relink_stops(|id| resolver.resolve(EntityKind::Color, id))?;
        }

        clone.styles = self.styles.clone();
        resolver.styles = clone.styles.iter().map(|s| s.id).collect();
        for style in &mut clone.styles {
            style.relink(&mut |kind, id| resolver.resolve(kind, id))?;
        }
        for property in &clone.properties {
            if let PropertyValue::Style(Some(style)) = property.value() {
                resolver.resolve(EntityKind::Style, *style)?;
            }
        }

        clone.sketches = self.sketches.clone();
        for sketch in &mut clone.sketches {
            sketch.relink(&mut |kind, id| resolver.resolve(kind, id))?;
        }
        if let Some(selected) = self.selected_sketch {
            if clone.find_sketch(selected).is_none() {
                return Err(FolioError::DanglingReference {
                    kind: EntityKind::Sketch,
                    id: selected,
                });
            }
            clone.selected_sketch = Some(selected);
        }

        clone.rebuild_subscriptions();
        log::debug!(
            "cloned portfolio {} ({} sketches, {} styles, {} colors, {} gradients, {} properties)",
            clone.id,
            clone.sketches.len(),
            clone.styles.len(),
            clone.colors.len(),
            clone.gradients.len(),
            clone.properties.len(),
        );
        Ok(clone)
    }

    /// Every cross reference in the portfolio, owner first.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        let mut push = |owner, kind, target| refs.push(Reference { owner, kind, target });

        for color in &self.colors {
            if let Some(base) = color.base() {
                push(color.id, EntityKind::Color, base);
            }
            for c in color.connections.iter() {
                push(color.id, EntityKind::Property, c.property);
            }
        }
        for gradient in &self.gradients {
            for color in gradient.linked_colors() {
                push(gradient.id, EntityKind::Color, color);
            }
        }
        for property in &self.properties {
            if let PropertyValue::Style(Some(style)) = property.value() {
                push(property.id, EntityKind::Style, *style);
            }
        }

        let mut styles = Vec::new();
        styles.extend(self.styles.iter());
        for sketch in &self.sketches {
            if let Some(selected) = sketch.selected_shape() {
                push(sketch.id, EntityKind::Shape, selected);
            }
            sketch.walk(&mut |shape| {
                match shape.style() {
                    ShapeStyle::Shared(style) => push(shape.id, EntityKind::Style, *style),
                    ShapeStyle::Owned(style) => styles.push(&**style),
                }
                for c in shape.connections.iter() {
                    push(shape.id, EntityKind::Property, c.property);
                }
            });
        }
        for style in styles {
            for (source, link) in style.links() {
                let kind = match link {
                    crate::links::Link::Gradient(_) => EntityKind::Gradient,
                    _ => EntityKind::Color,
                };
                push(style.id, kind, source);
            }
            for c in style.connections.iter() {
                push(style.id, EntityKind::Property, c.property);
            }
        }
        if let Some(selected) = self.selected_sketch {
            push(self.id, EntityKind::Sketch, selected);
        }
        refs
    }

    /// References whose target is missing from this portfolio.
    pub fn dangling_references(&self) -> Vec<Reference> {
        self.references()
            .into_iter()
            .filter(|r| !self.contains_entity(r.kind, r.target))
            .collect()
    }
}
