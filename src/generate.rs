//! Asynchronous generation workflows.
//!
//! The orchestrator drives per-scene work (enhance, then render) without
//! blocking unrelated scenes. Steps within one scene are strictly
//! sequential; a second call on a busy scene is rejected as a no-op, never
//! queued. The store lock is only ever taken between await points, and
//! every post-await mutation re-resolves the scene by id, so interleaved
//! edits and reorders cannot misdirect a completion handler. In-flight
//! work always runs to completion; there is no cancellation token.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{BoardError, BoardResult};
use crate::project::model::ChatMessage;
use crate::project::store::{Begin, ProjectStore};
use crate::services::{
    ChatSession, FailureKind, ImageGenerator, PromptEnhancer, RenderRequest, ScriptAnalyzer,
    ServiceError,
};

/// The project store as shared by async workflows.
pub type SharedStore = Arc<Mutex<ProjectStore>>;

/// Outcome counts of a whole-project generation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Scenes the sweep started a workflow for.
    pub attempted: usize,
    /// Scenes that ended with an image.
    pub rendered: usize,
    /// Scenes that ended in the Failed state.
    pub failed: usize,
    /// Scenes skipped: already rendered, busy, or gone by the time the
    /// sweep reached them.
    pub skipped: usize,
}

/// Drives per-scene asynchronous rendering against the shared store.
pub struct GenerationOrchestrator {
    store: SharedStore,
    enhancer: Arc<dyn PromptEnhancer>,
    generator: Arc<dyn ImageGenerator>,
    analyzer: Arc<dyn ScriptAnalyzer>,
}

impl GenerationOrchestrator {
    pub fn new(
        store: SharedStore,
        enhancer: Arc<dyn PromptEnhancer>,
        generator: Arc<dyn ImageGenerator>,
        analyzer: Arc<dyn ScriptAnalyzer>,
    ) -> Self {
        Self {
            store,
            enhancer,
            generator,
            analyzer,
        }
    }

    fn store(&self) -> MutexGuard<'_, ProjectStore> {
        self.store.lock().expect("project store lock poisoned")
    }

    /// The full per-scene workflow: enhance the prompt, then render an
    /// image with the project's current aspect ratio and resolution.
    ///
    /// A busy scene makes this a no-op (not an error); an unknown id is an
    /// error. Service failures are recorded on the scene as a classified
    /// Failed state and never propagate out of the workflow.
    pub async fn generate_image(&self, scene_id: &str) -> BoardResult<()> {
        let prompt = match self.claim(scene_id, ProjectStore::begin_image_generation)? {
            Some(prompt) => prompt,
            None => return Ok(()),
        };

        // Step 2: enhancement. The pre-enhancement prompt (and image) is
        // preserved in the scene's history by apply_enhanced_prompt.
        let enhanced = match self.enhancer.enhance(&prompt).await {
            Ok(enhanced) => enhanced,
            Err(err) => {
                self.record_failure(scene_id, &err);
                return Ok(());
            }
        };
        if !self.store().apply_enhanced_prompt(scene_id, &enhanced) {
            // Scene deleted while enhancing; the workflow dissolves.
            log::debug!("scene {} vanished during enhancement", scene_id);
            return Ok(());
        }

        // Step 3: the render request reads the configuration as it is now,
        // not as it was when the workflow started.
        let request = {
            let store = self.store();
            let state = store.state();
            RenderRequest {
                prompt: enhanced,
                aspect_ratio: state.aspect_ratio,
                resolution: state.resolution,
            }
        };

        // Step 4: render.
        match self.generator.render(&request).await {
            Ok(image_url) => {
                self.store().complete_image_generation(scene_id, &image_url);
            }
            Err(err) => self.record_failure(scene_id, &err),
        }
        Ok(())
    }

    /// Standalone prompt enhancement. An unchanged response is a successful
    /// no-op: no history entry, image preserved.
    pub async fn enhance_prompt(&self, scene_id: &str) -> BoardResult<()> {
        let prompt = match self.claim(scene_id, ProjectStore::begin_prompt_enhancement)? {
            Some(prompt) => prompt,
            None => return Ok(()),
        };

        match self.enhancer.enhance(&prompt).await {
            Ok(enhanced) => {
                self.store().complete_prompt_enhancement(scene_id, &enhanced);
            }
            Err(err) => self.record_failure(scene_id, &err),
        }
        Ok(())
    }

    /// Regenerates the visual prompt from the scene's description.
    pub async fn regenerate_text(&self, scene_id: &str) -> BoardResult<()> {
        let description = {
            match self.store().begin_text_regeneration(scene_id) {
                Begin::Missing => return Err(BoardError::scene_not_found(scene_id)),
                Begin::Busy => return Ok(()),
                Begin::Started => {}
            }
            match self.store().state().find_scene(scene_id) {
                Some(scene) => scene.description.clone(),
                None => return Ok(()),
            }
        };

        match self.analyzer.rewrite_prompt(&description).await {
            Ok(prompt) => {
                self.store().complete_text_regeneration(scene_id, &prompt);
            }
            Err(err) => self.record_failure(scene_id, &err),
        }
        Ok(())
    }

    /// Renders every scene that has no image yet, strictly sequentially in
    /// group order then scene order. Sequential on purpose: it respects
    /// external rate limits and keeps status reporting unambiguous. Each
    /// scene is re-checked against the live state when the sweep reaches
    /// it, and per-scene failures do not stop the sweep.
    pub async fn generate_all(&self) -> SweepSummary {
        let ids = self.store().state().scene_ids_in_order();
        let mut summary = SweepSummary::default();

        for id in ids {
            let eligible = {
                let store = self.store();
                match store.state().find_scene(&id) {
                    Some(scene) => scene.image_url.is_none() && !scene.is_busy(),
                    None => false,
                }
            };
            if !eligible {
                summary.skipped += 1;
                continue;
            }

            summary.attempted += 1;
            let _ = self.generate_image(&id).await;

            let store = self.store();
            match store.state().find_scene(&id) {
                Some(scene) if scene.image_url.is_some() => summary.rendered += 1,
                Some(_) => summary.failed += 1,
                None => summary.skipped += 1,
            }
        }

        log::debug!(
            "generate_all: {} attempted, {} rendered, {} failed, {} skipped",
            summary.attempted,
            summary.rendered,
            summary.failed,
            summary.skipped
        );
        summary
    }

    /// Claims a scene for a workflow and returns its current visual prompt.
    /// `Ok(None)` means the scene is busy and the call is a no-op.
    fn claim(
        &self,
        scene_id: &str,
        begin: fn(&mut ProjectStore, &str) -> Begin,
    ) -> BoardResult<Option<String>> {
        let mut store = self.store();
        match begin(&mut *store, scene_id) {
            Begin::Missing => Err(BoardError::scene_not_found(scene_id)),
            Begin::Busy => {
                log::debug!("scene {} is busy; rejecting re-entrant call", scene_id);
                Ok(None)
            }
            Begin::Started => Ok(store
                .state()
                .find_scene(scene_id)
                .map(|s| s.visual_prompt.clone())),
        }
    }

    fn record_failure(&self, scene_id: &str, err: &ServiceError) {
        let kind = FailureKind::classify(err);
        log::warn!("scene {} generation failed ({:?}): {}", scene_id, kind, err);
        self.store().fail_scene(scene_id, kind);
    }
}

// =============================================================================
// CHAT
// =============================================================================

/// One in-flight assistant message at a time, appended to the project's
/// transcript on both ends of the exchange.
pub struct ChatWorkflow {
    store: SharedStore,
    session: Box<dyn ChatSession>,
}

impl ChatWorkflow {
    pub fn new(store: SharedStore, session: Box<dyn ChatSession>) -> Self {
        Self { store, session }
    }

    fn store(&self) -> MutexGuard<'_, ProjectStore> {
        self.store.lock().expect("project store lock poisoned")
    }

    /// Sends one message. Rejected with [`BoardError::ChatBusy`] while a
    /// previous send is still in flight. The user's message stays in the
    /// transcript even when the reply fails; the guard is always released.
    pub async fn send(&mut self, text: &str) -> BoardResult<String> {
        {
            let mut store = self.store();
            if !store.begin_chat_send() {
                return Err(BoardError::ChatBusy);
            }
            store.push_chat_message(ChatMessage::user(text));
        }

        let result = self.session.send(text).await;

        let mut store = self.store();
        store.end_chat_send();
        match result {
            Ok(reply) => {
                store.push_chat_message(ChatMessage::model(&reply));
                Ok(reply)
            }
            Err(err) => Err(err.into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
