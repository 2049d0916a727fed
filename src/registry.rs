//! Layer registry - the ordered collection of sprite layers
//!
//! Registry order is stacking order: later entries paint over earlier ones.
//! Visibility has two operating modes. Category-driven selection
//! ([`LayerRegistry::set_visible`]) is exclusive: at most one visible layer
//! per single-select category. Free-form mode
//! ([`LayerRegistry::toggle_visible`]) flips layers independently and
//! permits any number of visible layers per category. These are distinct
//! modes, not two states of one invariant.

use crate::models::{Category, LayerDef};
use rand::Rng;

/// Stacking rank for the known category names; unknown categories sort last.
const CATEGORY_RANKS: &[(&str, u32)] = &[
    ("skin", 1),
    ("eyes", 2),
    ("torso", 3),
    ("facial-hairs", 4),
    ("feet", 5),
    ("legs", 6),
    ("hand-gear", 7),
    ("hairs", 8),
    ("head-gear", 9),
];

/// Sort key for a category name from the fixed ordering table.
pub fn category_rank(category: &str) -> u32 {
    CATEGORY_RANKS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, rank)| *rank)
        .unwrap_or(u32::MAX)
}

/// One selectable image asset in the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteLayer {
    /// Unique identifier; duplicates within one registry are a caller error.
    pub name: String,
    /// Payload reference: file path or data URI. Never dropped by registry
    /// mutations.
    pub image: String,
    pub category: String,
    pub show: bool,
    /// Stacking sort key derived from the category ordering table.
    pub order: u32,
}

impl SpriteLayer {
    fn from_def(def: LayerDef) -> Self {
        let order = category_rank(&def.category);
        Self {
            name: def.name,
            image: def.image,
            category: def.category,
            show: def.show,
            order,
        }
    }
}

/// Ordered collection of sprite layers plus their category table.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<SpriteLayer>,
    categories: Vec<Category>,
}

impl LayerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category. Re-registering a name replaces its flags.
    pub fn register_category(&mut self, category: Category) {
        if let Some(existing) = self.categories.iter_mut().find(|c| c.name == category.name) {
            *existing = category;
        } else {
            self.categories.push(category);
        }
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn layers(&self) -> &[SpriteLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Append one layer, tagging it with its category's stacking rank.
    pub fn add_layer(&mut self, def: LayerDef) {
        self.layers.push(SpriteLayer::from_def(def));
    }

    /// Append a batch of layers. Entries land in input order; an entry never
    /// disturbs the ones added before it.
    pub fn add_layers(&mut self, defs: impl IntoIterator<Item = LayerDef>) {
        for def in defs {
            self.add_layer(def);
        }
    }

    /// Stable-sort the stack by category rank, typically once after
    /// ingestion. Explicit reorders afterwards are preserved.
    pub fn sort_by_rank(&mut self) {
        self.layers.sort_by_key(|layer| layer.order);
    }

    /// Exclusive selection within a category.
    ///
    /// Shows the named layer and hides every other layer sharing its
    /// category; `None` clears the whole category. Returns `false` when the
    /// named layer does not exist in the category.
    pub fn set_visible(&mut self, name: Option<&str>, category: &str) -> bool {
        if let Some(name) = name {
            let found = self
                .layers
                .iter()
                .any(|l| l.name == name && l.category == category);
            if !found {
                return false;
            }
            for layer in &mut self.layers {
                if layer.name == name && layer.category == category {
                    layer.show = true;
                } else if layer.category == category {
                    layer.show = false;
                }
            }
        } else {
            for layer in &mut self.layers {
                if layer.category == category {
                    layer.show = false;
                }
            }
        }
        true
    }

    /// Free-form visibility flip, independent of the layer's category.
    pub fn toggle_visible(&mut self, index: usize) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.show = !layer.show;
        }
    }

    /// Relocate a layer within the stack.
    ///
    /// A `to` index outside `[0, len - 1]` is a silent no-op: the collection
    /// never goes sparse or reordered out of bounds.
    pub fn move_layer(&mut self, from: usize, to: usize) {
        if from >= self.layers.len() || to >= self.layers.len() {
            return;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
    }

    /// Delete one layer. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) {
        if index < self.layers.len() {
            self.layers.remove(index);
        }
    }

    /// Randomize the visible selection, one pick per registered category.
    ///
    /// For each category an index is chosen uniformly among its members;
    /// when the category is `randomizer_nullable` a 0-or-1 coin flip is then
    /// subtracted before the show-comparison, so the pick can land on the
    /// out-of-range index -1 and deselect the category entirely. The
    /// null-vs-selected split is therefore biased by category size, not a
    /// clean 50/50.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        for category in &self.categories {
            let members: Vec<usize> = self
                .layers
                .iter()
                .enumerate()
                .filter(|(_, l)| l.category == category.name)
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }

            let mut pick = rng.gen_range(0..members.len()) as i64;
            if category.randomizer_nullable {
                pick -= rng.gen_range(0..=1i64);
            }

            for (position, &index) in members.iter().enumerate() {
                self.layers[index].show = position as i64 == pick;
            }
        }
    }

    /// Owned, ordered copy of the visible layers.
    ///
    /// Mutations replace registry state and readers only ever observe
    /// complete snapshots, never a half-applied update.
    pub fn visible_snapshot(&self) -> Vec<SpriteLayer> {
        self.layers.iter().filter(|l| l.show).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(name: &str, category: &str, show: bool) -> LayerDef {
        LayerDef {
            name: name.to_string(),
            category: category.to_string(),
            image: format!("{}.png", name),
            show,
        }
    }

    fn registry_with(defs: Vec<LayerDef>) -> LayerRegistry {
        let mut registry = LayerRegistry::new();
        for def in &defs {
            if registry.category(&def.category).is_none() {
                registry.register_category(Category {
                    name: def.category.clone(),
                    can_disable: true,
                    randomizer_nullable: false,
                });
            }
        }
        registry.add_layers(defs);
        registry
    }

    fn order_of(registry: &LayerRegistry) -> Vec<&str> {
        registry.layers().iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_category_rank_table() {
        assert_eq!(category_rank("skin"), 1);
        assert_eq!(category_rank("head-gear"), 9);
        // Unknown categories sort last
        assert_eq!(category_rank("wings"), u32::MAX);
    }

    #[test]
    fn test_sort_by_rank_is_stable() {
        let mut registry = registry_with(vec![
            layer("hat", "head-gear", false),
            layer("base-0", "skin", true),
            layer("eyes-0", "eyes", false),
            layer("eyes-1", "eyes", false),
        ]);
        registry.sort_by_rank();
        assert_eq!(order_of(&registry), vec!["base-0", "eyes-0", "eyes-1", "hat"]);
    }

    #[test]
    fn test_set_visible_is_exclusive_within_category() {
        let mut registry = registry_with(vec![
            layer("eyes-0", "eyes", true),
            layer("eyes-1", "eyes", false),
            layer("base-0", "skin", true),
        ]);

        assert!(registry.set_visible(Some("eyes-1"), "eyes"));

        let shows: Vec<bool> = registry.layers().iter().map(|l| l.show).collect();
        assert_eq!(shows, vec![false, true, true]);
    }

    #[test]
    fn test_set_visible_none_clears_category() {
        let mut registry = registry_with(vec![
            layer("eyes-0", "eyes", true),
            layer("base-0", "skin", true),
        ]);

        assert!(registry.set_visible(None, "eyes"));
        assert!(!registry.layers()[0].show);
        // Other categories untouched
        assert!(registry.layers()[1].show);
    }

    #[test]
    fn test_set_visible_unknown_layer() {
        let mut registry = registry_with(vec![layer("eyes-0", "eyes", true)]);
        assert!(!registry.set_visible(Some("missing"), "eyes"));
        // Selection unchanged on failure
        assert!(registry.layers()[0].show);
    }

    #[test]
    fn test_toggle_visible_is_independent() {
        let mut registry = registry_with(vec![
            layer("eyes-0", "eyes", true),
            layer("eyes-1", "eyes", false),
        ]);

        // Free-form mode: both layers of one category may be visible
        registry.toggle_visible(1);
        assert!(registry.layers()[0].show);
        assert!(registry.layers()[1].show);

        registry.toggle_visible(1);
        assert!(!registry.layers()[1].show);
    }

    #[test]
    fn test_move_layer() {
        let mut registry = registry_with(vec![
            layer("a", "eyes", false),
            layer("b", "eyes", false),
            layer("c", "eyes", false),
        ]);

        registry.move_layer(0, 2);
        assert_eq!(order_of(&registry), vec!["b", "c", "a"]);

        registry.move_layer(2, 0);
        assert_eq!(order_of(&registry), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_layer_out_of_range_is_noop() {
        let mut registry = registry_with(vec![
            layer("a", "eyes", false),
            layer("b", "eyes", false),
            layer("c", "eyes", false),
        ]);
        let before: Vec<SpriteLayer> = registry.layers().to_vec();

        registry.move_layer(0, 3);
        registry.move_layer(7, 1);
        registry.move_layer(9, 9);

        assert_eq!(registry.layers(), &before[..]);
    }

    #[test]
    fn test_remove_keeps_payloads_of_others() {
        let mut registry = registry_with(vec![
            layer("a", "eyes", false),
            layer("b", "eyes", true),
        ]);
        registry.remove(0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.layers()[0].image, "b.png");

        // Out of range is ignored
        registry.remove(5);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_randomize_single_select_invariant() {
        // A: 3 members non-nullable -> always exactly one visible.
        // B: 2 members nullable -> zero or one visible.
        let mut registry = registry_with(vec![
            layer("a0", "torso", false),
            layer("a1", "torso", false),
            layer("a2", "torso", true),
            layer("b0", "hairs", true),
            layer("b1", "hairs", false),
        ]);
        registry.register_category(Category {
            name: "hairs".to_string(),
            can_disable: true,
            randomizer_nullable: true,
        });

        let mut rng = StdRng::seed_from_u64(7);
        let mut saw_empty_b = false;
        let mut saw_visible_b = false;

        for _ in 0..200 {
            registry.randomize(&mut rng);

            let visible_a = registry
                .layers()
                .iter()
                .filter(|l| l.category == "torso" && l.show)
                .count();
            assert_eq!(visible_a, 1);

            let visible_b = registry
                .layers()
                .iter()
                .filter(|l| l.category == "hairs" && l.show)
                .count();
            assert!(visible_b <= 1);
            saw_empty_b |= visible_b == 0;
            saw_visible_b |= visible_b == 1;
        }

        // Both outcomes of the nullable coin flip occur
        assert!(saw_empty_b);
        assert!(saw_visible_b);
    }

    #[test]
    fn test_randomize_never_empties_non_nullable() {
        let mut registry = registry_with(vec![
            layer("e0", "eyes", false),
            layer("e1", "eyes", false),
        ]);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            registry.randomize(&mut rng);
            let visible = registry.layers().iter().filter(|l| l.show).count();
            assert_eq!(visible, 1);
        }
    }

    #[test]
    fn test_randomize_is_seeded_deterministic() {
        let defs = vec![
            layer("a0", "torso", false),
            layer("a1", "torso", false),
            layer("h0", "hairs", false),
            layer("h1", "hairs", false),
            layer("h2", "hairs", false),
        ];
        let mut first = registry_with(defs.clone());
        first.register_category(Category {
            name: "hairs".to_string(),
            can_disable: true,
            randomizer_nullable: true,
        });
        let mut second = first.clone();

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            first.randomize(&mut rng_a);
            second.randomize(&mut rng_b);
            let shows_a: Vec<bool> = first.layers().iter().map(|l| l.show).collect();
            let shows_b: Vec<bool> = second.layers().iter().map(|l| l.show).collect();
            assert_eq!(shows_a, shows_b);
        }
    }

    #[test]
    fn test_visible_snapshot_preserves_order() {
        let registry = registry_with(vec![
            layer("base-0", "skin", true),
            layer("eyes-0", "eyes", false),
            layer("eyes-1", "eyes", true),
            layer("hat", "head-gear", true),
        ]);

        let snapshot = registry.visible_snapshot();
        let names: Vec<&str> = snapshot.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["base-0", "eyes-1", "hat"]);
    }

    #[test]
    fn test_snapshot_is_owned_copy() {
        let mut registry = registry_with(vec![layer("base-0", "skin", true)]);
        let snapshot = registry.visible_snapshot();

        // Later mutation does not reach into the published snapshot
        registry.set_visible(None, "skin");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].show);
    }
}
