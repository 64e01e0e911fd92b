//! Gallery interaction model.
//!
//! Everything a gallery front end does between user input and API calls:
//! ordering photos, multi-select, the lightbox with keyboard, wheel, mouse
//! and touch handling, and bookkeeping for deleting a selection. No I/O
//! happens here; callers feed events in and render the resulting state.

mod lightbox;
mod selection;

use std::collections::HashSet;

use crate::photo::{filename_from_url, sort_urls_desc, timestamp_of};

pub use lightbox::{
    Direction, Lightbox, Point, Transform, DOUBLE_CLICK_ZOOM, MAX_ZOOM, MIN_ZOOM,
    SWIPE_THRESHOLD_PX, WHEEL_ZOOM_STEP,
};
pub use selection::Selection;

/// A photo shown in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub url: String,
    pub alt: String,
}

impl Photo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: "Photo".to_string(),
        }
    }

    /// Stored file name, as used by the delete and download endpoints.
    pub fn filename(&self) -> Option<String> {
        filename_from_url(&self.url)
    }
}

/// Keys the gallery reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
    Char(char),
}

/// A key press with its Ctrl modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn ctrl(key: Key) -> Self {
        Self { key, ctrl: true }
    }
}

/// Photos to delete for the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    /// Photo URLs, highest index first
    pub urls: Vec<String>,
    /// Stored file names, parallel to `urls`
    pub filenames: Vec<String>,
}

impl RemovalPlan {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Gallery state: photos newest first, selection and lightbox.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    photos: Vec<Photo>,
    selection_mode: bool,
    selection: Selection,
    lightbox: Lightbox,
}

impl Gallery {
    /// Build a gallery from photo URLs in any order.
    pub fn new<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut gallery = Self::default();
        gallery.set_photos(urls);
        gallery
    }

    /// Replace the photo list. Selection and lightbox are reset.
    pub fn set_photos<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.photos = sort_urls_desc(urls).into_iter().map(Photo::new).collect();
        self.selection.clear();
        self.lightbox.close();
    }

    /// Merge newly uploaded photos in, keeping newest-first order.
    ///
    /// Indices shift, so the selection is cleared.
    pub fn add_photos<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen: HashSet<String> = self.photos.iter().map(|p| p.url.clone()).collect();
        let open_url = self.current_photo().map(|p| p.url.clone());

        self.photos.extend(
            urls.into_iter()
                .filter(|url| seen.insert(url.clone()))
                .map(Photo::new),
        );
        self.photos
            .sort_by_key(|p| std::cmp::Reverse(timestamp_of(&p.url)));
        self.selection.clear();

        if let Some(url) = open_url {
            if let Some(index) = self.photos.iter().position(|p| p.url == url) {
                self.lightbox.open(index, self.photos.len());
            }
        }
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn urls(&self) -> Vec<String> {
        self.photos.iter().map(|p| p.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    // Selection

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Enter or leave selection mode. Leaving clears the selection.
    pub fn toggle_selection_mode(&mut self) {
        self.selection_mode = !self.selection_mode;
        if !self.selection_mode {
            self.selection.clear();
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.contains(index)
    }

    /// Toggle photo `index`. Out-of-range indices are ignored.
    pub fn toggle(&mut self, index: usize) {
        if index < self.photos.len() {
            self.selection.toggle(index);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Leave selection mode, dropping the selection.
    pub fn cancel_selection(&mut self) {
        self.selection_mode = false;
        self.selection.clear();
    }

    /// Select everything, or nothing if everything was already selected.
    pub fn toggle_select_all(&mut self) {
        if self.all_selected() {
            self.selection.clear();
        } else {
            self.selection.select_all(self.photos.len());
        }
    }

    pub fn selection_count(&self) -> usize {
        self.selection.count()
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn all_selected(&self) -> bool {
        self.selection.covers(self.photos.len())
    }

    /// Selected photos in gallery order.
    pub fn selected_photos(&self) -> Vec<&Photo> {
        self.selection
            .indices()
            .filter_map(|i| self.photos.get(i))
            .collect()
    }

    /// Stored file names of the selected photos, for the zip download.
    pub fn selected_filenames(&self) -> Vec<String> {
        self.selected_photos()
            .into_iter()
            .filter_map(Photo::filename)
            .collect()
    }

    /// Work out which photos a delete-selected action should remove.
    pub fn removal_plan(&self) -> RemovalPlan {
        let mut plan = RemovalPlan::default();
        for index in self.selection.indices().rev() {
            let Some(photo) = self.photos.get(index) else {
                continue;
            };
            if let Some(name) = photo.filename() {
                plan.urls.push(photo.url.clone());
                plan.filenames.push(name);
            }
        }
        plan
    }

    /// Drop the photos whose deletion succeeded and clear the selection.
    ///
    /// Returns how many photos were removed.
    pub fn apply_removed<'a, I>(&mut self, deleted_urls: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let deleted: HashSet<&str> = deleted_urls.into_iter().collect();
        let before = self.photos.len();
        self.photos.retain(|p| !deleted.contains(p.url.as_str()));
        self.selection.clear();
        self.lightbox.clamp_to(self.photos.len());
        before - self.photos.len()
    }

    /// Remove a single photo by URL.
    pub fn remove_photo(&mut self, url: &str) -> bool {
        self.apply_removed([url]) > 0
    }

    // Lightbox

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    pub fn open(&mut self, index: usize) -> bool {
        self.lightbox.open(index, self.photos.len())
    }

    pub fn close(&mut self) {
        self.lightbox.close();
    }

    pub fn next(&mut self) -> Option<usize> {
        self.lightbox.next(self.photos.len())
    }

    pub fn prev(&mut self) -> Option<usize> {
        self.lightbox.prev(self.photos.len())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.lightbox.index()
    }

    pub fn current_photo(&self) -> Option<&Photo> {
        self.lightbox.index().and_then(|i| self.photos.get(i))
    }

    /// URLs to load ahead of the open photo.
    pub fn preload_urls(&self) -> Vec<&str> {
        self.lightbox
            .preload_indices(self.photos.len())
            .into_iter()
            .filter_map(|i| self.photos.get(i))
            .map(|p| p.url.as_str())
            .collect()
    }

    pub fn rotate(&mut self) {
        if self.lightbox.is_open() {
            self.lightbox.rotate();
        }
    }

    pub fn transform_css(&self) -> String {
        self.lightbox.transform().css()
    }

    /// Handle a key press. Returns true when the key was consumed.
    ///
    /// Ctrl+A works anywhere: it enters selection mode and toggles
    /// select-all. The other keys only act while the lightbox is open.
    pub fn handle_key(&mut self, press: KeyPress) -> bool {
        if press.ctrl && matches!(press.key, Key::Char(c) if c.eq_ignore_ascii_case(&'a')) {
            self.selection_mode = true;
            self.toggle_select_all();
            return true;
        }

        if !self.lightbox.is_open() {
            return false;
        }

        match press.key {
            Key::ArrowLeft => {
                self.prev();
            }
            Key::ArrowRight => {
                self.next();
            }
            Key::Escape => self.close(),
            Key::Char(c) if c.eq_ignore_ascii_case(&'r') => self.lightbox.rotate(),
            Key::Char(_) => return false,
        }
        true
    }

    pub fn wheel(&mut self, delta_y: f64) -> bool {
        self.lightbox.wheel(delta_y)
    }

    pub fn double_click(&mut self) {
        self.lightbox.double_click();
    }

    pub fn mouse_down(&mut self, at: Point) {
        self.lightbox.mouse_down(at);
    }

    pub fn mouse_move(&mut self, at: Point) {
        self.lightbox.mouse_move(at);
    }

    pub fn mouse_up(&mut self) {
        self.lightbox.mouse_up();
    }

    pub fn touch_start(&mut self, touches: &[Point]) {
        self.lightbox.touch_start(touches);
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        self.lightbox.touch_move(touches);
    }

    /// Finish a touch gesture; returns the new index if a swipe navigated.
    pub fn touch_end(&mut self) -> Option<usize> {
        self.lightbox.touch_end(self.photos.len())
    }
}
