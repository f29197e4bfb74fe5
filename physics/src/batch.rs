use crate::{body::BodyHandle, contact::Contact};
use std::collections::HashSet;
use tracing::trace;

/// Contacts that are connected through shared bodies, resolved together.
#[derive(Clone, Debug, Default)]
pub struct ContactBatch {
    contacts: Vec<Contact>,
    bodies: HashSet<BodyHandle>,
}

impl ContactBatch {
    fn with_contact(contact: Contact) -> Self {
        let mut batch = Self::default();
        batch.push(contact);
        batch
    }

    fn push(&mut self, contact: Contact) {
        self.bodies.extend(contact.bodies.iter().flatten());
        self.contacts.push(contact);
    }

    fn absorb(&mut self, other: ContactBatch) {
        self.bodies.extend(other.bodies);
        self.contacts.extend(other.contacts);
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub(crate) fn contacts_mut(&mut self) -> &mut [Contact] {
        &mut self.contacts
    }

    pub fn bodies(&self) -> &HashSet<BodyHandle> {
        &self.bodies
    }

    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// All live batches for one step. No body appears in more than one batch.
#[derive(Clone, Debug, Default)]
pub struct ContactBatches {
    batches: Vec<ContactBatch>,
}

impl ContactBatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contact to the batch touching its bodies, merging two batches when the contact
    /// bridges them.
    pub fn insert(&mut self, contact: Contact) {
        let mut matches = contact
            .bodies
            .iter()
            .flatten()
            .filter_map(|handle| {
                self.batches
                    .iter()
                    .position(|batch| batch.contains_body(*handle))
            })
            .collect::<Vec<_>>();
        matches.sort_unstable();
        matches.dedup();

        match matches[..] {
            [] => self.batches.push(ContactBatch::with_contact(contact)),
            [index] => self.batches[index].push(contact),
            [keep, merge, ..] => {
                let merged = self.batches.swap_remove(merge);
                trace!(
                    keep,
                    merge,
                    contacts = merged.len(),
                    "merging contact batches"
                );
                self.batches[keep].absorb(merged);
                self.batches[keep].push(contact);
            }
        }
    }

    /// Drops every contact touching `handle`, re-batching what remains of the affected batch.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        let Some(index) = self
            .batches
            .iter()
            .position(|batch| batch.contains_body(handle))
        else {
            return;
        };
        let batch = self.batches.swap_remove(index);
        for contact in batch.contacts {
            if !contact.involves(handle) {
                self.insert(contact);
            }
        }
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn contact_count(&self) -> usize {
        self.batches.iter().map(ContactBatch::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactBatch> {
        self.batches.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactBatch> {
        self.batches.iter_mut()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::material::Material;
    use glam::Vec3;
    use rand::{seq::SliceRandom, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    fn contact(a: u32, b: Option<u32>) -> Contact {
        Contact::new(
            Some(BodyHandle(a)),
            b.map(BodyHandle),
            Vec3::ZERO,
            Vec3::Y,
            0.1,
            Material::default().into(),
        )
    }

    fn handles(ids: &[u32]) -> HashSet<BodyHandle> {
        ids.iter().copied().map(BodyHandle).collect()
    }

    #[test]
    fn test_chain_merges_in_any_order() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        for _ in 0..20 {
            let mut contacts = vec![contact(0, Some(1)), contact(2, Some(3)), contact(1, Some(2))];
            contacts.shuffle(&mut rng);

            let mut batches = ContactBatches::new();
            for c in contacts {
                batches.insert(c);
            }
            assert_eq!(batches.len(), 1);
            let batch = batches.iter().next().unwrap();
            assert_eq!(batch.len(), 3);
            assert_eq!(batch.bodies(), &handles(&[0, 1, 2, 3]));
        }
    }

    #[test]
    fn test_disjoint_pairs_stay_apart() {
        let mut batches = ContactBatches::new();
        batches.insert(contact(0, Some(1)));
        batches.insert(contact(2, Some(3)));
        batches.insert(contact(4, None));
        batches.insert(contact(5, None));
        assert_eq!(batches.len(), 4);
        assert_eq!(batches.contact_count(), 4);

        // static geometry has no body, so sharing it never merges
        batches.insert(contact(4, Some(5)));
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_remove_body_splits_chain() {
        let mut batches = ContactBatches::new();
        batches.insert(contact(0, Some(1)));
        batches.insert(contact(1, Some(2)));
        batches.insert(contact(2, Some(3)));
        assert_eq!(batches.len(), 1);

        batches.remove_body(BodyHandle(1));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches.contact_count(), 1);
        assert_eq!(batches.iter().next().unwrap().bodies(), &handles(&[2, 3]));

        batches.remove_body(BodyHandle(9));
        assert_eq!(batches.contact_count(), 1);
    }
}
