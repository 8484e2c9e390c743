//! Ordered selection with printer exclusivity

use tcad_core::{Scene, SceneObject};
use uuid::Uuid;

/// Highlight style the renderer applies to a selected object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightTag {
    Solid,
    Hole,
    Reference,
    HoleReference,
    Printer,
}

impl HighlightTag {
    pub fn for_object(object: &SceneObject) -> Self {
        if object.is_printer() {
            return HighlightTag::Printer;
        }
        let c = object.classification;
        match (c.is_hole(), c.is_reference()) {
            (false, false) => HighlightTag::Solid,
            (true, false) => HighlightTag::Hole,
            (false, true) => HighlightTag::Reference,
            (true, true) => HighlightTag::HoleReference,
        }
    }
}

/// One selected object and the tag captured when it was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEntry {
    pub object_id: Uuid,
    pub original_tag: HighlightTag,
}

/// Result of a selection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SelectionChange {
    Unchanged,
    Changed,
    /// The request was not allowed and nothing changed
    Refused,
}

impl SelectionChange {
    pub fn changed(self) -> bool {
        self == SelectionChange::Changed
    }

    fn from_bool(changed: bool) -> Self {
        if changed {
            SelectionChange::Changed
        } else {
            SelectionChange::Unchanged
        }
    }
}

/// The ordered set of selected objects
///
/// No duplicates. A printer, when selected, is the only member.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    entries: Vec<SelectionEntry>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; a non-additive add replaces the selection
    pub fn add(&mut self, object: &SceneObject, additive: bool) -> SelectionChange {
        let before = self.entries.clone();
        if !additive || object.is_printer() || self.has_printer() {
            if additive && !self.entries.is_empty() {
                tracing::debug!("Printer selection is exclusive, clearing {} entries", self.len());
            }
            self.entries.clear();
        }
        if !self.contains(object.id) {
            self.entries.push(SelectionEntry {
                object_id: object.id,
                original_tag: HighlightTag::for_object(object),
            });
        }
        SelectionChange::from_bool(self.entries != before)
    }

    pub fn remove(&mut self, id: Uuid) -> SelectionChange {
        let len = self.entries.len();
        self.entries.retain(|e| e.object_id != id);
        SelectionChange::from_bool(self.entries.len() != len)
    }

    pub fn clear(&mut self) -> SelectionChange {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        SelectionChange::from_bool(changed)
    }

    /// Additive add when absent, remove when present
    pub fn toggle(&mut self, object: &SceneObject) -> SelectionChange {
        if self.contains(object.id) {
            self.remove(object.id)
        } else {
            self.add(object, true)
        }
    }

    /// Select every object except printers, in scene order
    pub fn select_all(&mut self, scene: &Scene) -> SelectionChange {
        let before = self.entries.clone();
        if self.has_printer() {
            self.entries.clear();
        }
        for object in scene.iter().filter(|o| !o.is_printer()) {
            if !self.contains(object.id) {
                self.entries.push(SelectionEntry {
                    object_id: object.id,
                    original_tag: HighlightTag::for_object(object),
                });
            }
        }
        SelectionChange::from_bool(self.entries != before)
    }

    /// Drop entries whose object is gone from the scene
    pub fn retain_existing(&mut self, scene: &Scene) -> SelectionChange {
        let len = self.entries.len();
        self.entries.retain(|e| scene.contains(e.object_id));
        SelectionChange::from_bool(self.entries.len() != len)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.iter().any(|e| e.object_id == id)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|e| e.object_id).collect()
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn has_printer(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.original_tag == HighlightTag::Printer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use tcad_core::{Classification, CreationConfig, ObjectKind};

    use super::*;

    fn scene() -> (Scene, Uuid, Uuid, Uuid) {
        let mut scene = Scene::new();
        let config = CreationConfig::default();
        let a = scene
            .add_primitive(ObjectKind::Cube, Vec3::ZERO, Classification::SOLID, &config)
            .unwrap();
        let b = scene
            .add_primitive(ObjectKind::Sphere, Vec3::X, Classification::HOLE, &config)
            .unwrap();
        let printer = scene.add_printer(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.2, 0.2, 0.2));
        (scene, a, b, printer)
    }

    #[test]
    fn test_add_replaces_unless_additive() {
        let (scene, a, b, _) = scene();
        let mut selection = SelectionSet::new();
        assert!(selection.add(scene.get(a).unwrap(), false).changed());
        assert!(selection.add(scene.get(b).unwrap(), false).changed());
        assert_eq!(selection.ids(), vec![b]);
        assert!(selection.add(scene.get(a).unwrap(), true).changed());
        assert_eq!(selection.ids(), vec![b, a]);
    }

    #[test]
    fn test_no_duplicates() {
        let (scene, a, _, _) = scene();
        let mut selection = SelectionSet::new();
        let _ = selection.add(scene.get(a).unwrap(), true);
        assert_eq!(
            selection.add(scene.get(a).unwrap(), true),
            SelectionChange::Unchanged
        );
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_printer_is_exclusive() {
        let (scene, a, b, printer) = scene();
        let mut selection = SelectionSet::new();
        let _ = selection.add(scene.get(a).unwrap(), true);
        let _ = selection.add(scene.get(b).unwrap(), true);
        let _ = selection.add(scene.get(printer).unwrap(), true);
        assert_eq!(selection.ids(), vec![printer]);
        assert!(selection.has_printer());

        let _ = selection.add(scene.get(a).unwrap(), true);
        assert_eq!(selection.ids(), vec![a]);
        assert!(!selection.has_printer());
    }

    #[test]
    fn test_highlight_tags() {
        let (mut scene, a, b, printer) = scene();
        assert_eq!(HighlightTag::for_object(scene.get(a).unwrap()), HighlightTag::Solid);
        assert_eq!(HighlightTag::for_object(scene.get(b).unwrap()), HighlightTag::Hole);
        assert_eq!(
            HighlightTag::for_object(scene.get(printer).unwrap()),
            HighlightTag::Printer
        );
        scene.get_mut(b).unwrap().classification = Classification::from_flags(true, true);
        assert_eq!(
            HighlightTag::for_object(scene.get(b).unwrap()),
            HighlightTag::HoleReference
        );
    }

    #[test]
    fn test_select_all_skips_printer() {
        let (scene, a, b, printer) = scene();
        let mut selection = SelectionSet::new();
        let _ = selection.add(scene.get(printer).unwrap(), false);
        assert!(selection.select_all(&scene).changed());
        assert_eq!(selection.ids(), vec![a, b]);
        assert_eq!(selection.select_all(&scene), SelectionChange::Unchanged);
    }

    #[test]
    fn test_toggle_and_retain_existing() {
        let (mut scene, a, b, _) = scene();
        let mut selection = SelectionSet::new();
        let _ = selection.toggle(scene.get(a).unwrap());
        let _ = selection.toggle(scene.get(b).unwrap());
        assert_eq!(selection.ids(), vec![a, b]);
        let _ = selection.toggle(scene.get(a).unwrap());
        assert_eq!(selection.ids(), vec![b]);

        scene.remove(b).unwrap();
        assert!(selection.retain_existing(&scene).changed());
        assert!(selection.is_empty());
        assert_eq!(selection.clear(), SelectionChange::Unchanged);
    }
}
