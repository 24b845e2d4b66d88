use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width")]
    pub width: f32,
    pub points: Vec<Point>,
}

fn default_color() -> String {
    "#ff3b30".to_string()
}

fn default_width() -> f32 {
    3.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SketchChange {
    pub stroke_count: usize,
    pub has_drawing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Arc<dyn Fn(&SketchChange) + Send + Sync>;

pub trait AnnotationSurface: Send + Sync {
    fn has_drawing(&self) -> bool;
    // Registers a listener that runs on the mutating thread after every change.
    fn subscribe(&self, listener: Listener) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

#[derive(Default)]
pub struct Sketch {
    strokes: RwLock<Vec<Stroke>>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for Sketch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sketch")
            .field("strokes", &self.strokes.read().len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> Vec<Stroke> {
        self.strokes.read().clone()
    }

    pub fn add_stroke(&self, stroke: Stroke) {
        if stroke.points.is_empty() {
            return;
        }
        self.mutate(|strokes| {
            strokes.push(stroke);
            true
        });
    }

    pub fn undo(&self) -> bool {
        self.mutate(|strokes| strokes.pop().is_some())
    }

    pub fn clear(&self) {
        self.mutate(|strokes| {
            let changed = !strokes.is_empty();
            strokes.clear();
            changed
        });
    }

    fn mutate<F>(&self, apply: F) -> bool
    where
        F: FnOnce(&mut Vec<Stroke>) -> bool,
    {
        let change = {
            let mut strokes = self.strokes.write();
            if !apply(&mut strokes) {
                return false;
            }
            SketchChange {
                stroke_count: strokes.len(),
                has_drawing: !strokes.is_empty(),
            }
        };
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&change);
        }
        true
    }
}

impl AnnotationSurface for Sketch {
    fn has_drawing(&self) -> bool {
        !self.strokes.read().is_empty()
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn stroke() -> Stroke {
        Stroke {
            color: default_color(),
            width: default_width(),
            points: vec![Point { x: 0.1, y: 0.2 }, Point { x: 0.3, y: 0.4 }],
        }
    }

    #[test]
    fn listeners_see_every_change() {
        let sketch = Sketch::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sketch.subscribe(Arc::new(move |change: &SketchChange| sink.lock().push(*change)));

        sketch.add_stroke(stroke());
        sketch.add_stroke(stroke());
        assert!(sketch.undo());
        sketch.clear();
        sketch.clear();

        let seen = seen.lock();
        let counts: Vec<_> = seen.iter().map(|c| (c.stroke_count, c.has_drawing)).collect();
        assert_eq!(counts, vec![(1, true), (2, true), (1, true), (0, false)]);
    }

    #[test]
    fn unsubscribed_listeners_stop() {
        let sketch = Sketch::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let id = sketch.subscribe(Arc::new(move |_: &SketchChange| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        sketch.add_stroke(stroke());
        assert!(sketch.unsubscribe(id));
        assert!(!sketch.unsubscribe(id));
        sketch.add_stroke(stroke());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_strokes_and_empty_undo_do_not_notify() {
        let sketch = Sketch::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        sketch.subscribe(Arc::new(move |_: &SketchChange| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        sketch.add_stroke(Stroke {
            points: Vec::new(),
            ..stroke()
        });
        assert!(!sketch.undo());
        assert!(!sketch.has_drawing());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_read_surface() {
        let sketch = Arc::new(Sketch::new());
        let observed = Arc::new(Mutex::new(None));
        let (surface, slot) = (sketch.clone(), observed.clone());
        sketch.subscribe(Arc::new(move |_: &SketchChange| {
            *slot.lock() = Some(surface.has_drawing());
        }));
        sketch.add_stroke(stroke());
        assert_eq!(*observed.lock(), Some(true));
    }

    #[test]
    fn strokes_deserialize_with_defaults() {
        let strokes: Vec<Stroke> =
            serde_json::from_str(r#"[{"points":[{"x":1.0,"y":2.0}]}]"#).unwrap();
        assert_eq!(strokes[0].width, 3.0);
        assert_eq!(strokes[0].color, "#ff3b30");
    }
}
