//! In-memory view of one ad's images. The ad service loads the rows inside
//! the update transaction, applies the request through this type and writes
//! the resulting cover flags and positions back.

use super::ad_models::AdImage;

#[derive(Debug, Clone)]
pub struct ImageSet {
    ad_id: i64,
    images: Vec<AdImage>,
}

impl ImageSet {
    /// Images of other ads are dropped.
    pub fn new(ad_id: i64, images: Vec<AdImage>) -> Self {
        let images = images.into_iter().filter(|i| i.ad_id == ad_id).collect();
        Self { ad_id, images }
    }

    pub fn images(&self) -> &[AdImage] {
        &self.images
    }

    pub fn into_images(mut self) -> Vec<AdImage> {
        self.images.sort_by_key(|i| (i.position, i.id));
        self.images
    }

    fn owns(&self, image_id: i64) -> bool {
        self.images.iter().any(|i| i.id == image_id)
    }

    /// Removes the requested images that belong to this ad and returns them.
    /// Ids of other ads' images are ignored.
    pub fn remove(&mut self, image_ids: &[i64]) -> Vec<AdImage> {
        let (removed, kept) = std::mem::take(&mut self.images)
            .into_iter()
            .partition(|i| image_ids.contains(&i.id));
        self.images = kept;
        removed
    }

    /// Position for the next appended image: one past the current maximum,
    /// or 0 for an empty set.
    pub fn next_position(&self) -> i32 {
        self.images
            .iter()
            .map(|i| i.position)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Appends a freshly stored image. New images never start as cover.
    pub fn push(&mut self, mut image: AdImage) {
        if image.ad_id != self.ad_id {
            return;
        }
        image.is_cover = false;
        self.images.push(image);
    }

    /// With a target, clears every cover flag and sets it on the target if
    /// the target belongs to this ad. Without one, keeps the current cover or
    /// promotes the lowest-positioned image.
    pub fn set_cover(&mut self, target: Option<i64>) {
        match target {
            Some(target) => {
                for image in &mut self.images {
                    image.is_cover = image.id == target;
                }
            }
            None => {
                if !self.images.iter().any(|i| i.is_cover) {
                    self.promote_first();
                }
            }
        }
    }

    /// Assigns `position = index` to every listed id owned by this ad.
    pub fn reorder(&mut self, order: &[i64]) {
        for (index, id) in order.iter().enumerate() {
            if let Some(image) = self.images.iter_mut().find(|i| i.id == *id) {
                image.position = index as i32;
            }
        }
    }

    /// Exit contract: a non-empty set has exactly one cover. Zero covers
    /// promotes the lowest position; several keep only the lowest-positioned
    /// one.
    pub fn enforce_single_cover(&mut self) {
        let mut covers: Vec<(i32, i64)> = self
            .images
            .iter()
            .filter(|i| i.is_cover)
            .map(|i| (i.position, i.id))
            .collect();

        match covers.len() {
            0 => self.promote_first(),
            1 => {}
            _ => {
                covers.sort_unstable();
                let keep = covers[0].1;
                for image in &mut self.images {
                    image.is_cover = image.id == keep;
                }
            }
        }
    }

    fn promote_first(&mut self) {
        if let Some(first) = self.images.iter_mut().min_by_key(|i| (i.position, i.id)) {
            first.is_cover = true;
        }
    }

    pub fn cover(&self) -> Option<&AdImage> {
        self.images.iter().find(|i| i.is_cover)
    }

    /// Applies the four request steps after removal and upload:
    /// cover selection, reordering, then the single-cover contract.
    pub fn arrange(&mut self, cover_image_id: Option<i64>, images_order: Option<&[i64]>) {
        if let Some(target) = cover_image_id {
            if !self.owns(target) {
                tracing::debug!(
                    "Cover image {} does not belong to ad {}; cover will be repaired",
                    target,
                    self.ad_id
                );
            }
        }
        self.set_cover(cover_image_id);
        if let Some(order) = images_order {
            self.reorder(order);
        }
        self.enforce_single_cover();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: i64, ad_id: i64, position: i32, is_cover: bool) -> AdImage {
        AdImage {
            id,
            ad_id,
            path: format!("ads/{ad_id}/{id}.jpg"),
            is_cover,
            position,
        }
    }

    fn covers(set: &ImageSet) -> Vec<i64> {
        set.images().iter().filter(|i| i.is_cover).map(|i| i.id).collect()
    }

    #[test]
    fn test_remove_ignores_foreign_images() {
        // Image 5 belongs to ad 9, not ad 2.
        let mut set = ImageSet::new(2, vec![image(1, 2, 0, true), image(5, 9, 0, true)]);
        assert_eq!(set.images().len(), 1);

        let removed = set.remove(&[5]);
        assert!(removed.is_empty());
        assert_eq!(set.images().len(), 1);
        assert_eq!(covers(&set), vec![1]);
    }

    #[test]
    fn test_remove_returns_removed_images() {
        let mut set = ImageSet::new(2, vec![image(1, 2, 0, true), image(2, 2, 1, false)]);
        let removed = set.remove(&[1, 42]);

        assert_eq!(removed.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(set.images().len(), 1);
    }

    #[test]
    fn test_removing_cover_promotes_lowest_position() {
        let mut set = ImageSet::new(
            2,
            vec![image(1, 2, 0, true), image(2, 2, 2, false), image(3, 2, 1, false)],
        );
        set.remove(&[1]);
        set.arrange(None, None);

        assert_eq!(covers(&set), vec![3]);
    }

    #[test]
    fn test_new_images_append_after_max_position_and_are_never_cover() {
        let mut set = ImageSet::new(4, vec![]);
        assert_eq!(set.next_position(), 0);

        set.push(image(10, 4, set.next_position(), true));
        set.push(image(11, 4, set.next_position(), true));
        assert_eq!(set.images()[1].position, 1);
        assert!(covers(&set).is_empty());

        set.arrange(None, None);
        assert_eq!(covers(&set), vec![10]);

        let mut set = ImageSet::new(4, vec![image(1, 4, 7, true)]);
        assert_eq!(set.next_position(), 8);
        set.push(image(2, 5, 0, false));
        assert_eq!(set.images().len(), 1);
    }

    #[test]
    fn test_explicit_cover_replaces_previous() {
        let mut set = ImageSet::new(1, vec![image(1, 1, 0, true), image(2, 1, 1, false)]);
        set.arrange(Some(2), None);

        assert_eq!(covers(&set), vec![2]);
    }

    #[test]
    fn test_foreign_cover_target_is_repaired() {
        let mut set = ImageSet::new(1, vec![image(1, 1, 1, true), image(2, 1, 0, false)]);
        set.set_cover(Some(99));
        assert!(covers(&set).is_empty());

        set.enforce_single_cover();
        assert_eq!(covers(&set), vec![2]);
    }

    #[test]
    fn test_reorder_assigns_list_indices_to_owned_ids() {
        let mut set = ImageSet::new(
            1,
            vec![image(1, 1, 0, true), image(2, 1, 1, false), image(3, 1, 2, false)],
        );
        set.arrange(None, Some(&[3, 77, 1, 2]));

        let positions: Vec<(i64, i32)> = set
            .clone()
            .into_images()
            .iter()
            .map(|i| (i.id, i.position))
            .collect();
        assert_eq!(positions, vec![(3, 0), (1, 2), (2, 3)]);
        assert_eq!(covers(&set), vec![1]);
    }

    #[test]
    fn test_multiple_covers_collapse_to_one() {
        let mut set = ImageSet::new(
            1,
            vec![image(1, 1, 2, true), image(2, 1, 1, true), image(3, 1, 0, false)],
        );
        set.enforce_single_cover();

        assert_eq!(covers(&set), vec![2]);
        assert_eq!(set.cover().map(|i| i.id), Some(2));
    }

    #[test]
    fn test_every_combination_leaves_one_cover() {
        let base = vec![image(1, 1, 0, false), image(2, 1, 1, false), image(3, 1, 2, true)];
        let removals: [&[i64]; 4] = [&[], &[3], &[1, 2], &[1, 2, 3]];
        let targets = [None, Some(1), Some(3), Some(99)];
        let orders: [Option<&[i64]>; 3] = [None, Some(&[3, 2, 1]), Some(&[2])];

        for remove in removals {
            for target in targets {
                for order in orders {
                    let mut set = ImageSet::new(1, base.clone());
                    set.remove(remove);
                    set.push(image(50, 1, set.next_position(), false));
                    set.arrange(target, order);

                    assert_eq!(
                        covers(&set).len(),
                        1,
                        "remove={remove:?} target={target:?} order={order:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_set_stays_empty() {
        let mut set = ImageSet::new(1, vec![]);
        set.arrange(Some(1), Some(&[1]));
        assert!(set.images().is_empty());
        assert!(set.cover().is_none());
    }
}
