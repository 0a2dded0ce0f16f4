use std::sync::{Arc, Weak};

use folio_shared::{
    log::trace,
    parking_lot::Mutex,
    Handle, IndexingContainer,
};

/// Load trigger attribute value that marks the default anchor of lazy components.
pub const LAZY_LOAD_TRIGGER: &str = "lazy";

/// A laid-out element of the page. Positions are in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: Option<String>,
    pub load_trigger: Option<String>,
    pub top: f32,
    pub height: f32,
}

impl Element {
    pub fn new(top: f32, height: f32) -> Self {
        Self {
            id: None,
            load_trigger: None,
            top,
            height,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_load_trigger(mut self, load_trigger: impl Into<String>) -> Self {
        self.load_trigger = Some(load_trigger.into());
        self
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    fn matches(&self, anchor: &Anchor) -> bool {
        match anchor {
            Anchor::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Anchor::LoadTrigger(load_trigger) => self.load_trigger.as_deref() == Some(load_trigger.as_str()),
        }
    }
}

/// Identifies the element a lazy component waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Id(String),
    LoadTrigger(String),
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::LoadTrigger(LAZY_LOAD_TRIGGER.to_owned())
    }
}

struct ObservationState {
    element: Handle<Element>,
    margin: f32,
    entered: bool,
}

struct ViewportState {
    scroll_top: f32,
    height: f32,
    elements: IndexingContainer<Element>,
    observations: IndexingContainer<ObservationState>,
}

impl ViewportState {
    fn intersects(&self, element: &Element, margin: f32) -> bool {
        let visible_top = self.scroll_top - margin;
        let visible_bottom = self.scroll_top + self.height + margin;
        element.top <= visible_bottom && element.bottom() >= visible_top
    }

    /// Marks the observations whose element entered their margin. Entering is sticky.
    fn refresh(&mut self) {
        let mut entered = Vec::new();
        for (handle, observation) in self.observations.iter() {
            if observation.entered {
                continue;
            }
            let Some(element) = self.elements.get(&observation.element) else {
                continue;
            };
            if self.intersects(element, observation.margin) {
                entered.push(handle);
            }
        }
        for handle in entered {
            if let Some(observation) = self.observations.get_mut(&handle) {
                trace!("Observation {} entered the viewport", handle.index());
                observation.entered = true;
            }
        }
    }
}

/// The visible region of the page and the elements laid out on it.
///
/// The host mirrors layout and scroll changes into the viewport. Cloning is cheap
/// and every clone refers to the same viewport.
#[derive(Clone)]
pub struct Viewport {
    state: Arc<Mutex<ViewportState>>,
}

impl Viewport {
    pub fn new(height: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewportState {
                scroll_top: 0.0,
                height,
                elements: IndexingContainer::new(),
                observations: IndexingContainer::new(),
            })),
        }
    }

    pub fn insert_element(&self, element: Element) -> Handle<Element> {
        let mut state = self.state.lock();
        let handle = state.elements.insert(element);
        state.refresh();
        handle
    }

    /// Removes the element. Observations of it stay registered but never enter.
    pub fn remove_element(&self, handle: &Handle<Element>) -> Option<Element> {
        self.state.lock().elements.remove(handle)
    }

    /// Moves an element after a layout change.
    pub fn set_element_bounds(&self, handle: &Handle<Element>, top: f32, height: f32) {
        let mut state = self.state.lock();
        if let Some(element) = state.elements.get_mut(handle) {
            element.top = top;
            element.height = height;
        }
        state.refresh();
    }

    pub fn scroll_to(&self, scroll_top: f32) {
        let mut state = self.state.lock();
        state.scroll_top = scroll_top;
        state.refresh();
    }

    pub fn resize(&self, height: f32) {
        let mut state = self.state.lock();
        state.height = height;
        state.refresh();
    }

    pub fn scroll_top(&self) -> f32 {
        self.state.lock().scroll_top
    }

    /// Returns the first element matching the `anchor`.
    pub fn find(&self, anchor: &Anchor) -> Option<Handle<Element>> {
        let state = self.state.lock();
        let handle = state
            .elements
            .iter()
            .find(|(_, element)| element.matches(anchor))
            .map(|(handle, _)| handle);
        handle
    }

    /// Starts observing whether `element` comes within `margin` pixels of the visible region.
    /// The observation is unregistered when the returned [`Observation`] is dropped.
    pub fn observe(&self, element: &Handle<Element>, margin: f32) -> Observation {
        let mut state = self.state.lock();
        let handle = state.observations.insert(ObservationState {
            element: *element,
            margin,
            entered: false,
        });
        state.refresh();
        Observation {
            handle,
            viewport: Arc::downgrade(&self.state),
        }
    }

    /// Number of registered observations.
    pub fn observation_count(&self) -> usize {
        self.state.lock().observations.len()
    }
}

/// Registration of an element in the [`Viewport`]'s proximity detection.
pub struct Observation {
    handle: Handle<ObservationState>,
    viewport: Weak<Mutex<ViewportState>>,
}

impl Observation {
    /// Returns `true` once the element has come within the margin.
    pub fn has_entered(&self) -> bool {
        let Some(state) = self.viewport.upgrade() else {
            return false;
        };
        let state = state.lock();
        let entered = state.observations.get(&self.handle).is_some_and(|observation| observation.entered);
        entered
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if let Some(state) = self.viewport.upgrade() {
            state.lock().observations.remove(&self.handle);
        }
    }
}
