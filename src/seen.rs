use std::collections::HashSet;

use crate::twitch::Clip;

#[derive(Debug, Default)]
pub(crate) struct SeenClips {
    ids: HashSet<String>,
}

impl SeenClips {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn prime(&mut self, clips: &[Clip]) -> usize {
        clips
            .iter()
            .filter(|clip| self.ids.insert(clip.id.clone()))
            .count()
    }

    // Input order is kept; a repeat within the batch is returned once.
    pub(crate) fn unseen<'a>(&self, clips: &'a [Clip]) -> Vec<&'a Clip> {
        let mut batch = HashSet::new();
        clips
            .iter()
            .filter(|&clip| !self.ids.contains(&clip.id) && batch.insert(clip.id.as_str()))
            .collect()
    }

    pub(crate) fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}
