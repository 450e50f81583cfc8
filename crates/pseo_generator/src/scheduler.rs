//! Work-item backlog and batch selection.

use pseo_core::{ExistingContent, WorkItem};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use crate::slug::slugify;

/// The configured dimensions of content to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSpace {
    pub subjects: Vec<String>,
    pub topics: Vec<String>,
    pub intents: Vec<String>,
    pub competitors: Vec<String>,
}

/// The complete backlog: subjects x topics x intents, followed by
/// subjects x competitors. Items are decoded from their index on demand, so
/// a large space is never materialized.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    space: ContentSpace,
}

impl WorkQueue {
    fn topic_slots(&self) -> usize {
        self.space.subjects.len() * self.space.topics.len() * self.space.intents.len()
    }

    fn comparison_slots(&self) -> usize {
        self.space.subjects.len() * self.space.competitors.len()
    }

    /// Number of backlog slots, including the unusable subject-vs-itself pairs.
    pub fn len(&self) -> usize {
        self.topic_slots() + self.comparison_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at `index`, or `None` past the end or for a subject compared
    /// with itself.
    pub fn get(&self, index: usize) -> Option<WorkItem> {
        let space = &self.space;

        if index < self.topic_slots() {
            let per_subject = space.topics.len() * space.intents.len();
            let subject = &space.subjects[index / per_subject];
            let topic = &space.topics[(index / space.intents.len()) % space.topics.len()];
            let intent = &space.intents[index % space.intents.len()];
            return Some(WorkItem::topic(subject, topic, intent));
        }

        let index = index - self.topic_slots();
        if index >= self.comparison_slots() {
            return None;
        }
        let subject = &space.subjects[index / space.competitors.len()];
        let competitor = &space.competitors[index % space.competitors.len()];
        if subject.eq_ignore_ascii_case(competitor) {
            return None;
        }
        Some(WorkItem::comparison(subject, competitor))
    }

    pub fn iter(&self) -> impl Iterator<Item = WorkItem> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl<'a> IntoIterator for &'a WorkQueue {
    type Item = WorkItem;
    type IntoIter = Box<dyn Iterator<Item = WorkItem> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

pub fn build_queue(space: &ContentSpace) -> WorkQueue {
    WorkQueue {
        space: space.clone(),
    }
}

/// Cheap pre-filter: true when the item's probable title or slug prefix
/// matches something already published. Not a guarantee of uniqueness.
pub fn collides(item: &WorkItem, existing: &ExistingContent) -> bool {
    let title = item.probable_title();
    existing.collides(&title, &slugify(&title))
}

pub fn next_batch(queue: &WorkQueue, existing: &ExistingContent, batch_size: usize) -> Vec<WorkItem> {
    next_batch_with_rng(queue, existing, batch_size, &mut rand::thread_rng())
}

/// Claim up to `batch_size` items in uniformly random order, skipping items
/// that collide with `existing` and repeats of an already claimed key.
pub fn next_batch_with_rng<R: Rng + ?Sized>(
    queue: &WorkQueue,
    existing: &ExistingContent,
    batch_size: usize,
    rng: &mut R,
) -> Vec<WorkItem> {
    let mut order: Vec<usize> = (0..queue.len()).collect();
    order.shuffle(rng);

    let mut seen = HashSet::new();
    order
        .into_iter()
        .filter_map(|i| queue.get(i))
        .filter(|item| !collides(item, existing))
        .filter(|item| seen.insert(item.key()))
        .take(batch_size)
        .collect()
}

/// How many backlog items are still eligible against `existing`.
pub fn remaining(queue: &WorkQueue, existing: &ExistingContent) -> usize {
    let mut seen = HashSet::new();
    queue
        .iter()
        .filter(|item| !collides(item, existing))
        .filter(|item| seen.insert(item.key()))
        .count()
}
