//! Slideshow state: which approved uploads are queued, which one is on
//! screen, and which have already been shown. Time is driven from outside
//! (see `runner`), so every transition here is a plain method call.

use std::collections::HashSet;

use libs::models::Upload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Not rotating, nothing happened.
    Idle,
    /// Moved on to this index.
    Next(usize),
    /// Ran past the last item. These ids are now shown and the queue is empty.
    Finished(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View<'a> {
    Qr,
    Waiting,
    Slide {
        upload: &'a Upload,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Default)]
pub struct Slideshow {
    queue: Vec<Upload>,
    index: usize,
    active: bool,
    shown: HashSet<String>,
    qr_overlay: bool,
}

impl Slideshow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn qr_visible(&self) -> bool {
        self.qr_overlay
    }

    /// Refilling mid-rotation would stretch the current run, so fetch only
    /// while idle.
    pub fn should_poll(&self) -> bool {
        !self.active
    }

    /// The item timer only runs while rotating and not behind the overlay.
    pub fn rotating(&self) -> bool {
        self.active && !self.qr_overlay
    }

    pub fn was_shown(&self, id: &str) -> bool {
        self.shown.contains(id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue whatever in `items` is neither queued nor already shown.
    /// Returns how many were added.
    pub fn merge(&mut self, items: impl IntoIterator<Item = Upload>) -> usize {
        let mut added = 0;
        for item in items {
            if self.was_shown(&item.id) || self.queue.iter().any(|q| q.id == item.id) {
                continue;
            }
            self.queue.push(item);
            added += 1;
        }
        if added > 0 {
            self.start_if_idle();
        }
        added
    }

    fn start_if_idle(&mut self) {
        if !self.active && !self.qr_overlay && !self.queue.is_empty() {
            self.active = true;
            self.index = 0;
        }
    }

    pub fn advance(&mut self) -> Advance {
        if !self.active {
            return Advance::Idle;
        }
        if self.queue.is_empty() {
            self.active = false;
            self.index = 0;
            return Advance::Idle;
        }

        let next = self.index + 1;
        if next < self.queue.len() {
            self.index = next;
            return Advance::Next(next);
        }

        let ids: Vec<String> = self.queue.drain(..).map(|u| u.id).collect();
        self.shown.extend(ids.iter().cloned());
        self.active = false;
        self.index = 0;
        Advance::Finished(ids)
    }

    pub fn show_qr(&mut self) {
        self.qr_overlay = true;
    }

    /// Drop the overlay. Rotation resumes at the same index; a queue filled
    /// while the overlay was up starts now.
    pub fn hide_qr(&mut self) {
        self.qr_overlay = false;
        self.start_if_idle();
    }

    pub fn current(&self) -> View<'_> {
        if self.qr_overlay {
            return View::Qr;
        }
        match self.queue.get(self.index) {
            Some(upload) if self.active => View::Slide {
                upload,
                index: self.index,
                len: self.queue.len(),
            },
            _ => View::Waiting,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use libs::models::UploadStatus;

    use super::*;

    pub(crate) fn upload(id: &str) -> Upload {
        Upload {
            id: id.to_string(),
            photo_url: Some(format!("/uploads/{id}.jpg")),
            message: None,
            status: UploadStatus::Approved,
            displayed: false,
            scheduled_for: None,
            created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
            uploaded_by: None,
        }
    }

    fn shown_id(show: &Slideshow) -> Option<&str> {
        match show.current() {
            View::Slide { upload, .. } => Some(upload.id.as_str()),
            _ => None,
        }
    }

    #[test]
    fn starts_idle_and_waiting() {
        let mut show = Slideshow::new();
        assert!(show.should_poll());
        assert_eq!(show.current(), View::Waiting);
        assert_eq!(show.advance(), Advance::Idle);
    }

    #[test]
    fn rotates_through_the_queue_then_goes_idle() {
        let mut show = Slideshow::new();
        assert_eq!(show.merge(["A", "B", "C"].map(upload)), 3);
        assert!(show.is_active());
        assert!(!show.should_poll());
        assert_eq!(shown_id(&show), Some("A"));

        assert_eq!(show.advance(), Advance::Next(1));
        assert_eq!(shown_id(&show), Some("B"));
        assert_eq!(show.advance(), Advance::Next(2));
        assert_eq!(shown_id(&show), Some("C"));

        assert_eq!(
            show.advance(),
            Advance::Finished(vec!["A".into(), "B".into(), "C".into()])
        );
        assert!(!show.is_active());
        assert_eq!(show.queue_len(), 0);
        assert_eq!(show.current(), View::Waiting);
        assert!(show.was_shown("B"));
    }

    #[test]
    fn merge_never_readmits_shown_or_queued_items() {
        let mut show = Slideshow::new();
        show.merge(["A", "B"].map(upload));
        assert_eq!(show.merge(["B", "C"].map(upload)), 1);
        assert_eq!(show.queue_len(), 3);

        while !matches!(show.advance(), Advance::Finished(_)) {}

        // the API may keep returning them until the displayed flag lands
        assert_eq!(show.merge(["A", "B", "C"].map(upload)), 0);
        assert!(!show.is_active());
        assert_eq!(show.merge(["C", "D"].map(upload)), 1);
        assert_eq!(shown_id(&show), Some("D"));
    }

    #[test]
    fn merging_while_active_keeps_position() {
        let mut show = Slideshow::new();
        show.merge(["A", "B"].map(upload));
        show.advance();
        show.merge([upload("C")]);
        assert_eq!(shown_id(&show), Some("B"));
        assert_eq!(show.advance(), Advance::Next(2));
    }

    #[test]
    fn qr_overlay_suspends_without_losing_position() {
        let mut show = Slideshow::new();
        show.merge(["A", "B", "C"].map(upload));
        show.advance();

        show.show_qr();
        assert_eq!(show.current(), View::Qr);
        assert!(!show.rotating());
        assert!(show.is_active());

        show.hide_qr();
        assert!(show.rotating());
        assert_eq!(shown_id(&show), Some("B"));
    }

    #[test]
    fn items_arriving_behind_the_overlay_start_when_it_hides() {
        let mut show = Slideshow::new();
        show.show_qr();
        show.merge([upload("A")]);
        assert!(!show.is_active());
        assert_eq!(show.current(), View::Qr);

        show.hide_qr();
        assert!(show.is_active());
        assert_eq!(shown_id(&show), Some("A"));
    }

    #[test]
    fn single_item_finishes_on_first_advance() {
        let mut show = Slideshow::new();
        show.merge([upload("A")]);
        assert_eq!(show.advance(), Advance::Finished(vec!["A".into()]));
    }
}
