//! Code editor overlay bound to a preview entity's HTML.
//!
//! The overlay is a two-state machine. While open it holds a working copy
//! that is decoupled from the entity until a save succeeds.
//!
//! ```text
//!   Closed --open()--> Open { working, baseline }
//!   Open   --close()-> Closed          (backdrop clicks never close)
//!   Open   --save()--> Open            (commits to the entity on success)
//! ```
//!
//! Saves are split into [`EditorOverlay::begin_save`] and
//! [`EditorOverlay::finish_save`] so a host event loop can keep handling
//! input while the request is in flight. A response that arrives after the
//! overlay was closed is ignored by the overlay.

use crate::error::{PreviewError, PreviewResult};
use crate::export::ExportRequest;
use crate::guard::{InFlight, InFlightToken};
use crate::notify::{Notification, Notifier};
use crate::preview::{PreviewEntity, PreviewId};
use crate::store::LinkWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum OverlayState {
    Closed,
    Open {
        /// Text in the editor.
        working: String,
        /// Last HTML known to be committed to the entity.
        baseline: String,
    },
}

/// A key press delivered to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    /// The key, as reported by the host.
    pub key: char,
    /// Ctrl held.
    pub ctrl: bool,
    /// Cmd/Meta held.
    pub meta: bool,
}

impl KeyChord {
    /// Ctrl + `key`.
    #[must_use]
    pub fn ctrl(key: char) -> Self {
        Self {
            key,
            ctrl: true,
            meta: false,
        }
    }

    /// Cmd + `key`.
    #[must_use]
    pub fn cmd(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: true,
        }
    }

    /// `key` without modifiers.
    #[must_use]
    pub fn plain(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    fn is_save(self) -> bool {
        (self.ctrl || self.meta) && self.key == 's'
    }
}

/// What the host should do with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Trigger a save and suppress the browser's own save dialog.
    Save,
    /// Let the key through.
    Ignore,
}

impl KeyAction {
    /// Whether the host must call `preventDefault` on the event.
    #[must_use]
    pub fn prevents_default(self) -> bool {
        matches!(self, Self::Save)
    }
}

/// An in-flight save. Holds the entity's in-flight token until dropped.
#[derive(Debug)]
pub struct SaveTicket {
    entity_id: PreviewId,
    html: String,
    session: u64,
    _token: InFlightToken<PreviewId>,
}

impl SaveTicket {
    /// Entity being saved.
    #[must_use]
    pub fn entity_id(&self) -> &PreviewId {
        &self.entity_id
    }

    /// HTML being sent.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Result of a save as seen by the overlay.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Persisted and committed to the entity.
    Committed,
    /// Not persisted; the working copy is untouched.
    Failed(PreviewError),
    /// Persisted after the overlay closed; committed to the entity silently.
    Detached,
    /// Failed after the overlay closed; nothing to report.
    Ignored,
}

impl SaveOutcome {
    /// Whether the entity now holds the saved HTML.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed | Self::Detached)
    }
}

/// Modal code editor for one preview entity.
#[derive(Debug, Clone)]
pub struct EditorOverlay {
    entity_id: PreviewId,
    state: OverlayState,
    session: u64,
}

impl EditorOverlay {
    /// Create a closed overlay for `entity_id`.
    #[must_use]
    pub fn new(entity_id: PreviewId) -> Self {
        Self {
            entity_id,
            state: OverlayState::Closed,
            session: 0,
        }
    }

    /// Entity this overlay edits.
    #[must_use]
    pub fn entity_id(&self) -> &PreviewId {
        &self.entity_id
    }

    /// Open the overlay with the entity's committed HTML.
    ///
    /// Opening an already open overlay keeps the working copy.
    pub fn open(&mut self, entity: &PreviewEntity) {
        if self.is_open() {
            return;
        }
        self.session += 1;
        self.state = OverlayState::Open {
            working: entity.html().to_string(),
            baseline: entity.html().to_string(),
        };
        tracing::debug!(entity = %self.entity_id, "editor opened");
    }

    /// Close the overlay, discarding unsaved edits.
    pub fn close(&mut self) {
        self.state = OverlayState::Closed;
        tracing::debug!(entity = %self.entity_id, "editor closed");
    }

    /// A click on the backdrop. Never closes the overlay.
    ///
    /// Returns whether the overlay closed, which is always `false`.
    pub fn backdrop_click(&mut self) -> bool {
        false
    }

    /// Whether the overlay is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, OverlayState::Open { .. })
    }

    /// Current working copy, if open.
    #[must_use]
    pub fn working_copy(&self) -> Option<&str> {
        match &self.state {
            OverlayState::Open { working, .. } => Some(working),
            OverlayState::Closed => None,
        }
    }

    /// Whether the working copy differs from the committed HTML.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.state {
            OverlayState::Open { working, baseline } => working != baseline,
            OverlayState::Closed => false,
        }
    }

    /// Replace the working copy.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::EditorClosed`] if the overlay is closed.
    pub fn edit(&mut self, text: impl Into<String>) -> PreviewResult<()> {
        match &mut self.state {
            OverlayState::Open { working, .. } => {
                *working = text.into();
                Ok(())
            }
            OverlayState::Closed => Err(PreviewError::EditorClosed),
        }
    }

    /// The entity's HTML was replaced from outside the editor.
    ///
    /// An open overlay without unsaved edits picks up the new HTML.
    pub fn entity_changed(&mut self, entity: &PreviewEntity) {
        if let OverlayState::Open { working, baseline } = &mut self.state {
            if working == baseline {
                *working = entity.html().to_string();
                *baseline = entity.html().to_string();
            }
        }
    }

    /// Map a key press while the overlay has focus.
    #[must_use]
    pub fn handle_key(&self, chord: KeyChord) -> KeyAction {
        if self.is_open() && chord.is_save() {
            KeyAction::Save
        } else {
            KeyAction::Ignore
        }
    }

    /// Hand the working copy, saved or not, to the export workflow.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::EditorClosed`] if the overlay is closed.
    pub fn request_export(&self) -> PreviewResult<ExportRequest> {
        let html = self.working_copy().ok_or(PreviewError::EditorClosed)?;
        Ok(ExportRequest {
            entity_id: self.entity_id.clone(),
            html: html.to_string(),
        })
    }

    /// Start a save of the working copy.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::EditorClosed`] if the overlay is closed, or
    /// [`PreviewError::Busy`] if a save for this entity is already in flight.
    pub fn begin_save(&mut self, guard: &InFlight<PreviewId>) -> PreviewResult<SaveTicket> {
        let html = self
            .working_copy()
            .ok_or(PreviewError::EditorClosed)?
            .to_string();
        let token = guard.try_acquire(&self.entity_id)?;
        Ok(SaveTicket {
            entity_id: self.entity_id.clone(),
            html,
            session: self.session,
            _token: token,
        })
    }

    /// Apply the store's response to a save started with [`Self::begin_save`].
    pub fn finish_save(
        &mut self,
        entity: &mut PreviewEntity,
        ticket: SaveTicket,
        result: PreviewResult<()>,
        notifier: &dyn Notifier,
    ) -> SaveOutcome {
        if entity.id() != &ticket.entity_id {
            tracing::warn!(
                expected = %ticket.entity_id,
                got = %entity.id(),
                "save response applied to the wrong entity"
            );
            return SaveOutcome::Ignored;
        }

        let attached = ticket.session == self.session && self.is_open();
        match (result, attached) {
            (Ok(()), true) => {
                entity.replace_html(ticket.html.as_str());
                if let OverlayState::Open { baseline, .. } = &mut self.state {
                    baseline.clone_from(&ticket.html);
                }
                tracing::info!(entity = %ticket.entity_id, "preview HTML saved");
                notifier.notify(Notification::success(
                    "Changes saved",
                    "Your HTML has been updated successfully.",
                ));
                SaveOutcome::Committed
            }
            (Ok(()), false) => {
                tracing::debug!(entity = %ticket.entity_id, "save finished after editor closed");
                entity.replace_html(ticket.html);
                SaveOutcome::Detached
            }
            (Err(err), true) => {
                tracing::warn!(entity = %ticket.entity_id, "Error saving HTML: {err}");
                notifier.notify(Notification::error(
                    "Error",
                    "Failed to save changes. Please try again.",
                ));
                SaveOutcome::Failed(err)
            }
            (Err(err), false) => {
                tracing::debug!(entity = %ticket.entity_id, "dropping failed save after close: {err}");
                SaveOutcome::Ignored
            }
        }
    }

    /// Persist the working copy through `writer` and commit it on success.
    pub async fn save(
        &mut self,
        entity: &mut PreviewEntity,
        writer: &dyn LinkWriter,
        guard: &InFlight<PreviewId>,
        notifier: &dyn Notifier,
    ) -> SaveOutcome {
        let ticket = match self.begin_save(guard) {
            Ok(ticket) => ticket,
            Err(err) => {
                notifier.notify(Notification::error("Error", err.user_message()));
                return SaveOutcome::Failed(err);
            }
        };
        let result = writer.update_html(ticket.entity_id(), ticket.html()).await;
        self.finish_save(entity, ticket, result, notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotificationLevel, NotificationLog};
    use crate::store::{LinkKey, LinkStore, MemoryLinkStore};
    use async_trait::async_trait;

    struct FailingWriter;

    #[async_trait]
    impl LinkWriter for FailingWriter {
        async fn update_html(&self, _id: &PreviewId, _html: &str) -> PreviewResult<()> {
            Err(PreviewError::Transport("status 500".into()))
        }
    }

    fn generated(id: &str, html: &str) -> PreviewEntity {
        let mut entity = PreviewEntity::new(id.into());
        entity.replace_html(html);
        entity
    }

    #[test]
    fn test_open_copies_committed_html() {
        let entity = generated("e1", "<p>hi</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        assert!(!overlay.is_open());
        overlay.open(&entity);
        assert_eq!(overlay.working_copy(), Some("<p>hi</p>"));
        assert!(!overlay.has_changes());
    }

    #[test]
    fn test_edit_is_decoupled_from_entity() {
        let entity = generated("e1", "<p>hi</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);
        overlay.edit("<p>draft</p>").expect("edit");
        assert!(overlay.has_changes());
        assert_eq!(entity.html(), "<p>hi</p>");
    }

    #[test]
    fn test_edit_while_closed_fails() {
        let mut overlay = EditorOverlay::new("e1".into());
        assert!(matches!(
            overlay.edit("x"),
            Err(PreviewError::EditorClosed)
        ));
    }

    #[test]
    fn test_backdrop_click_keeps_overlay_open() {
        let entity = generated("e1", "<p>hi</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);
        overlay.edit("<p>unsaved</p>").expect("edit");
        assert!(!overlay.backdrop_click());
        assert!(overlay.is_open());
        assert_eq!(overlay.working_copy(), Some("<p>unsaved</p>"));
    }

    #[test]
    fn test_save_chord() {
        let entity = generated("e1", "<p>hi</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        assert_eq!(overlay.handle_key(KeyChord::ctrl('s')), KeyAction::Ignore);

        overlay.open(&entity);
        assert_eq!(overlay.handle_key(KeyChord::ctrl('s')), KeyAction::Save);
        assert_eq!(overlay.handle_key(KeyChord::cmd('s')), KeyAction::Save);
        assert!(KeyAction::Save.prevents_default());
        assert_eq!(overlay.handle_key(KeyChord::plain('s')), KeyAction::Ignore);
        assert_eq!(overlay.handle_key(KeyChord::ctrl('p')), KeyAction::Ignore);
        assert!(!KeyAction::Ignore.prevents_default());
    }

    #[test]
    fn test_request_export_uses_unsaved_text() {
        let entity = generated("e1", "<p>saved</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);
        overlay.edit("<p>unsaved</p>").expect("edit");
        let request = overlay.request_export().expect("export request");
        assert_eq!(request.html, "<p>unsaved</p>");
        assert_eq!(request.entity_id, PreviewId::from_raw("e1"));
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let store = MemoryLinkStore::new();
        let guard = InFlight::new();
        let log = NotificationLog::new();
        let mut entity = generated("e2", "<p>old</p>");
        let mut overlay = EditorOverlay::new("e2".into());

        overlay.open(&entity);
        overlay.edit("<p>new</p>").expect("edit");
        let outcome = overlay.save(&mut entity, &store, &guard, &log).await;

        assert!(matches!(outcome, SaveOutcome::Committed));
        assert_eq!(entity.html(), "<p>new</p>");
        assert!(!overlay.has_changes());
        let stored = store
            .get(&LinkKey::Shape("e2".into()))
            .await
            .expect("get")
            .expect("record");
        assert_eq!(stored.html, "<p>new</p>");
        let toast = log.last().expect("toast");
        assert_eq!(toast.level, NotificationLevel::Success);
        assert_eq!(toast.title, "Changes saved");
        assert!(!guard.is_active(&PreviewId::from_raw("e2")));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_entity_and_working_copy() {
        let guard = InFlight::new();
        let log = NotificationLog::new();
        let mut entity = generated("e2", "<p>old</p>");
        let mut overlay = EditorOverlay::new("e2".into());

        overlay.open(&entity);
        overlay.edit("<p>new</p>").expect("edit");
        let outcome = overlay.save(&mut entity, &FailingWriter, &guard, &log).await;

        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert_eq!(entity.html(), "<p>old</p>");
        assert_eq!(overlay.working_copy(), Some("<p>new</p>"));
        let toast = log.last().expect("toast");
        assert_eq!(toast.level, NotificationLevel::Error);
        assert_eq!(toast.description, "Failed to save changes. Please try again.");
    }

    #[test]
    fn test_concurrent_save_is_rejected() {
        let guard = InFlight::new();
        let entity = generated("e1", "<p>x</p>");
        let mut first = EditorOverlay::new("e1".into());
        let mut second = EditorOverlay::new("e1".into());
        first.open(&entity);
        second.open(&entity);

        let _ticket = first.begin_save(&guard).expect("first save");
        let err = second.begin_save(&guard).unwrap_err();
        assert!(matches!(err, PreviewError::Busy(_)));
    }

    #[test]
    fn test_response_after_close_is_detached() {
        let guard = InFlight::new();
        let log = NotificationLog::new();
        let mut entity = generated("e1", "<p>old</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);
        overlay.edit("<p>new</p>").expect("edit");

        let ticket = overlay.begin_save(&guard).expect("begin");
        overlay.close();
        let outcome = overlay.finish_save(&mut entity, ticket, Ok(()), &log);

        assert!(matches!(outcome, SaveOutcome::Detached));
        assert!(outcome.is_committed());
        assert_eq!(entity.html(), "<p>new</p>");
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_failure_after_reopen_is_ignored() {
        let guard = InFlight::new();
        let log = NotificationLog::new();
        let mut entity = generated("e1", "<p>old</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);

        let ticket = overlay.begin_save(&guard).expect("begin");
        overlay.close();
        overlay.open(&entity);
        let outcome = overlay.finish_save(
            &mut entity,
            ticket,
            Err(PreviewError::Transport("reset".into())),
            &log,
        );

        assert!(matches!(outcome, SaveOutcome::Ignored));
        assert!(log.entries().is_empty());
        assert!(overlay.is_open());
    }

    #[test]
    fn test_response_for_another_entity_is_ignored() {
        let guard = InFlight::new();
        let log = NotificationLog::new();
        let mut entity = generated("e1", "<p>old</p>");
        let mut other = generated("e2", "<p>other</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);
        overlay.edit("<p>new</p>").expect("edit");

        let ticket = overlay.begin_save(&guard).expect("begin");
        let outcome = overlay.finish_save(&mut other, ticket, Ok(()), &log);

        assert!(matches!(outcome, SaveOutcome::Ignored));
        assert_eq!(other.html(), "<p>other</p>");
        assert_eq!(entity.html(), "<p>old</p>");
        assert!(overlay.has_changes());
        assert!(log.entries().is_empty());

        // The ticket is dropped, so a retry against the right entity goes through.
        let ticket = overlay.begin_save(&guard).expect("retry");
        let outcome = overlay.finish_save(&mut entity, ticket, Ok(()), &log);
        assert!(matches!(outcome, SaveOutcome::Committed));
        assert_eq!(entity.html(), "<p>new</p>");
    }

    #[test]
    fn test_edits_during_save_stay_dirty() {
        let guard = InFlight::new();
        let log = NotificationLog::new();
        let mut entity = generated("e1", "<p>v1</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);
        overlay.edit("<p>v2</p>").expect("edit");

        let ticket = overlay.begin_save(&guard).expect("begin");
        overlay.edit("<p>v3</p>").expect("edit while saving");
        let outcome = overlay.finish_save(&mut entity, ticket, Ok(()), &log);

        assert!(matches!(outcome, SaveOutcome::Committed));
        assert_eq!(entity.html(), "<p>v2</p>");
        assert_eq!(overlay.working_copy(), Some("<p>v3</p>"));
        assert!(overlay.has_changes());
    }

    #[test]
    fn test_entity_change_respects_unsaved_edits() {
        let mut entity = generated("e1", "<p>v1</p>");
        let mut overlay = EditorOverlay::new("e1".into());
        overlay.open(&entity);

        entity.set_generated("<p>regenerated</p>", "sketch");
        overlay.entity_changed(&entity);
        assert_eq!(overlay.working_copy(), Some("<p>regenerated</p>"));

        overlay.edit("<p>mine</p>").expect("edit");
        entity.set_generated("<p>again</p>", "sketch");
        overlay.entity_changed(&entity);
        assert_eq!(overlay.working_copy(), Some("<p>mine</p>"));
    }
}
