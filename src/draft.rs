use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::annotation::{AnnotationSurface, SketchChange, SubscriptionId};
use crate::comment::{Attachment, NewComment, GENERAL_TIMESTAMP};
use crate::player::Playhead;

pub struct Draft {
    pub text: String,
    pub timestamp: f64,
    pub attachments: Vec<Attachment>,
    has_drawing: Arc<AtomicBool>,
    observed: Option<(Arc<dyn AnnotationSurface>, SubscriptionId)>,
}

impl std::fmt::Debug for Draft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Draft")
            .field("text", &self.text)
            .field("timestamp", &self.timestamp)
            .field("attachments", &self.attachments)
            .field("has_drawing", &self.has_drawing())
            .field("observing", &self.observed.is_some())
            .finish()
    }
}

impl Draft {
    pub fn at_playhead(playhead: &dyn Playhead) -> Self {
        playhead.pause();
        Self::with_timestamp(playhead.position())
    }

    pub fn general() -> Self {
        Self::with_timestamp(GENERAL_TIMESTAMP)
    }

    fn with_timestamp(timestamp: f64) -> Self {
        Self {
            text: String::new(),
            timestamp,
            attachments: Vec::new(),
            has_drawing: Arc::new(AtomicBool::new(false)),
            observed: None,
        }
    }

    pub fn is_general(&self) -> bool {
        self.timestamp < 0.0
    }

    pub fn set_general(&mut self, general: bool, playhead: &dyn Playhead) {
        if general {
            self.timestamp = GENERAL_TIMESTAMP;
            self.detach();
        } else if self.is_general() {
            playhead.pause();
            self.timestamp = playhead.position();
        }
    }

    pub fn observe(&mut self, surface: Arc<dyn AnnotationSurface>) {
        self.detach();
        let flag = self.has_drawing.clone();
        flag.store(surface.has_drawing(), Ordering::SeqCst);
        let id = surface.subscribe(Arc::new(move |change: &SketchChange| {
            flag.store(change.has_drawing, Ordering::SeqCst);
        }));
        self.observed = Some((surface, id));
    }

    pub fn detach(&mut self) {
        if let Some((surface, id)) = self.observed.take() {
            surface.unsubscribe(id);
        }
        self.has_drawing.store(false, Ordering::SeqCst);
    }

    pub fn has_drawing(&self) -> bool {
        self.has_drawing.load(Ordering::SeqCst)
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn into_new_comment<A: Into<String>>(mut self, author: A) -> NewComment {
        let has_drawing = self.has_drawing();
        self.detach();
        NewComment {
            text: std::mem::take(&mut self.text),
            author: author.into(),
            timestamp: self.timestamp,
            attachments: std::mem::take(&mut self.attachments),
            has_drawing,
        }
    }
}

impl Drop for Draft {
    fn drop(&mut self) {
        self.detach();
    }
}
