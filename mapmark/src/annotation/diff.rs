use ahash::{HashMap, HashSet, HashSetExt};
use geojson::Feature;

use super::Annotation;
use crate::style::StyleDelegate;

/// Difference between two snapshots of an annotation collection.
///
/// Every id appears in at most one of the three sets.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationsDiff<T> {
    /// Annotations present only in the new snapshot.
    pub add: Vec<T>,
    /// Annotations present in both snapshots whose content changed.
    pub update: Vec<T>,
    /// Ids present only in the old snapshot.
    pub remove: Vec<String>,
}

impl<T: Annotation> AnnotationsDiff<T> {
    /// Computes the changes that turn `old` into `new`. Both snapshots must be free of duplicate ids.
    pub fn between(old: &[T], new: &[T]) -> Self {
        let old_by_id: HashMap<&str, &T> = old.iter().map(|a| (a.id(), a)).collect();
        let mut new_ids = HashSet::with_capacity(new.len());

        let mut add = vec![];
        let mut update = vec![];
        for annotation in new {
            new_ids.insert(annotation.id());
            match old_by_id.get(annotation.id()) {
                None => add.push(annotation.clone()),
                Some(previous) if *previous != annotation => update.push(annotation.clone()),
                Some(_) => {}
            }
        }

        let remove = old
            .iter()
            .filter(|a| !new_ids.contains(a.id()))
            .map(|a| a.id().to_string())
            .collect();

        Self { add, update, remove }
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Pushes the changes into the GeoJSON source with the given id: one call per non-empty set. Failures are
    /// logged.
    pub(crate) fn apply(&self, style: &dyn StyleDelegate, source_id: &str) {
        if !self.add.is_empty() {
            let features: Vec<Feature> = self.add.iter().map(Annotation::feature).collect();
            if let Err(err) = style.add_geojson_source_features(source_id, &features) {
                log::warn!("Failed to add {} features to source {source_id}: {err}", features.len());
            }
        }

        if !self.update.is_empty() {
            let features: Vec<Feature> = self.update.iter().map(Annotation::feature).collect();
            if let Err(err) = style.update_geojson_source_features(source_id, &features) {
                log::warn!("Failed to update {} features in source {source_id}: {err}", features.len());
            }
        }

        if !self.remove.is_empty() {
            if let Err(err) = style.remove_geojson_source_features(source_id, &self.remove) {
                log::warn!(
                    "Failed to remove {} features from source {source_id}: {err}",
                    self.remove.len()
                );
            }
        }
    }
}

/// Removes annotations with repeated ids, keeping the first occurrence.
pub(crate) fn remove_duplicates<T: Annotation>(annotations: &mut Vec<T>, manager_id: &str) {
    let mut seen = HashSet::with_capacity(annotations.len());
    annotations.retain(|annotation| {
        let is_new = seen.insert(annotation.id().to_string());
        if !is_new {
            log::warn!(
                "Duplicate annotation id {} in manager {manager_id}, the annotation is ignored",
                annotation.id()
            );
        }
        is_new
    });
}
