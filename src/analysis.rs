//! Script analysis workflow: turn the raw script into grouped scenes.
//!
//! Analysis is destructive: it discards every current group. Re-analyzing a
//! non-empty board therefore first takes a silent auto-snapshot, and the
//! board is cleared once the request is issued, so a late failure leaves an
//! empty (but recoverable) board rather than a half-replaced one.

use std::sync::{Arc, MutexGuard};

use crate::error::{BoardError, BoardResult};
use crate::generate::SharedStore;
use crate::project::model::{sequence_name, GroupingStrategy, Scene, SceneGroup};
use crate::project::store::ProjectStore;
use crate::services::{AnalysisResponse, AnalyzedScene, ScriptAnalyzer};

/// Runs whole-script analysis against the shared store.
pub struct AnalysisWorkflow {
    store: SharedStore,
    analyzer: Arc<dyn ScriptAnalyzer>,
}

impl AnalysisWorkflow {
    pub fn new(store: SharedStore, analyzer: Arc<dyn ScriptAnalyzer>) -> Self {
        Self { store, analyzer }
    }

    fn store(&self) -> MutexGuard<'_, ProjectStore> {
        self.store.lock().expect("project store lock poisoned")
    }

    /// Analyzes the current script with the current grouping strategy and
    /// replaces the board with the result.
    pub async fn analyze(&self) -> BoardResult<()> {
        let (script, strategy) = {
            let mut store = self.store();
            let script = store.state().script_text.clone();
            if script.trim().is_empty() {
                return Err(BoardError::EmptyScript);
            }
            let strategy = store.state().grouping_strategy;
            if store.state().scene_count() > 0 {
                store.create_auto_snapshot();
            }
            store.update(|state| state.scene_groups.clear());
            (script, strategy)
        };

        let response = self
            .analyzer
            .analyze(&script, strategy)
            .await
            .map_err(|e| BoardError::analysis_failed(e.to_string()))?;

        let groups = build_groups(response, strategy)?;
        log::debug!(
            "analysis produced {} groups under strategy {}",
            groups.len(),
            strategy
        );
        self.store().update(move |state| state.scene_groups = groups);
        Ok(())
    }
}

/// Chunks an analysis response into scene groups according to the strategy
/// that was *requested*. A response whose shape does not match the request
/// is an analysis failure, never adopted as-is.
pub fn build_groups(
    response: AnalysisResponse,
    strategy: GroupingStrategy,
) -> BoardResult<Vec<SceneGroup>> {
    match (strategy, response) {
        (GroupingStrategy::Single, AnalysisResponse::Flat(scenes)) => {
            Ok(vec![SceneGroup::new(sequence_name(1))
                .with_scenes(scenes.into_iter().map(scene_from_analyzed).collect())])
        }
        (GroupingStrategy::Batch(size), AnalysisResponse::Flat(scenes)) => {
            let scenes: Vec<Scene> = scenes.into_iter().map(scene_from_analyzed).collect();
            let mut groups = Vec::new();
            for (i, chunk) in scenes.chunks(size.max(1)).enumerate() {
                groups.push(SceneGroup::new(sequence_name(i + 1)).with_scenes(chunk.to_vec()));
            }
            Ok(groups)
        }
        (GroupingStrategy::Smart, AnalysisResponse::Grouped(groups)) => Ok(groups
            .into_iter()
            .enumerate()
            .map(|(i, g)| {
                let name = if g.name.trim().is_empty() {
                    sequence_name(i + 1)
                } else {
                    g.name
                };
                SceneGroup::new(name)
                    .with_scenes(g.scenes.into_iter().map(scene_from_analyzed).collect())
            })
            .collect()),
        (GroupingStrategy::Smart, AnalysisResponse::Flat(_)) => Err(BoardError::analysis_failed(
            "expected named groups for the smart strategy, got a flat scene list",
        )),
        (strategy, AnalysisResponse::Grouped(_)) => Err(BoardError::analysis_failed(format!(
            "expected a flat scene list for strategy '{}', got named groups",
            strategy
        ))),
    }
}

fn scene_from_analyzed(analyzed: AnalyzedScene) -> Scene {
    Scene::new(analyzed.scene_number)
        .with_description(analyzed.description)
        .with_visual_prompt(analyzed.visual_prompt)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerationOrchestrator;
    use crate::history::AUTO_SNAPSHOT_NAME;
    use crate::project::model::ProjectState;
    use crate::services::{AnalyzedGroup, ImageGenerator, PromptEnhancer, RenderRequest, ServiceError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedAnalyzer {
        response: AnalysisResponse,
    }

    #[async_trait]
    impl ScriptAnalyzer for FixedAnalyzer {
        async fn analyze(
            &self,
            _script: &str,
            _strategy: GroupingStrategy,
        ) -> Result<AnalysisResponse, ServiceError> {
            Ok(self.response.clone())
        }

        async fn rewrite_prompt(&self, _description: &str) -> Result<String, ServiceError> {
            Ok(String::new())
        }
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl ScriptAnalyzer for FailingAnalyzer {
        async fn analyze(
            &self,
            _script: &str,
            _strategy: GroupingStrategy,
        ) -> Result<AnalysisResponse, ServiceError> {
            Err(ServiceError::call("model overloaded"))
        }

        async fn rewrite_prompt(&self, _description: &str) -> Result<String, ServiceError> {
            Err(ServiceError::call("model overloaded"))
        }
    }

    struct EchoEnhancer;

    #[async_trait]
    impl PromptEnhancer for EchoEnhancer {
        async fn enhance(&self, prompt: &str) -> Result<String, ServiceError> {
            Ok(prompt.to_string())
        }
    }

    struct OkGenerator;

    #[async_trait]
    impl ImageGenerator for OkGenerator {
        async fn render(&self, _request: &RenderRequest) -> Result<String, ServiceError> {
            Ok("img-1".to_string())
        }
    }

    fn flat(n: i32) -> Vec<AnalyzedScene> {
        (1..=n)
            .map(|i| {
                AnalyzedScene::new(i)
                    .with_description(format!("scene {}", i))
                    .with_visual_prompt(format!("prompt {}", i))
            })
            .collect()
    }

    fn shared(script: &str, strategy: GroupingStrategy) -> SharedStore {
        let state = ProjectState {
            script_text: script.to_string(),
            grouping_strategy: strategy,
            ..Default::default()
        };
        Arc::new(Mutex::new(ProjectStore::with_state(state)))
    }

    #[tokio::test]
    async fn test_single_strategy_one_scene_then_generate() {
        let store = shared("INT. OFFICE - DAY", GroupingStrategy::Single);
        let workflow = AnalysisWorkflow::new(
            Arc::clone(&store),
            Arc::new(FixedAnalyzer {
                response: AnalysisResponse::Flat(flat(1)),
            }),
        );

        workflow.analyze().await.unwrap();
        let scene_id = {
            let store = store.lock().unwrap();
            let state = store.state();
            assert_eq!(state.scene_groups.len(), 1);
            assert_eq!(state.scene_groups[0].name, "Sequence 01");
            assert_eq!(state.scene_groups[0].scenes.len(), 1);
            assert_eq!(state.scene_groups[0].scenes[0].scene_number, 1);
            state.scene_groups[0].scenes[0].id.clone()
        };

        let orch = GenerationOrchestrator::new(
            Arc::clone(&store),
            Arc::new(EchoEnhancer),
            Arc::new(OkGenerator),
            Arc::new(FailingAnalyzer),
        );
        orch.generate_image(&scene_id).await.unwrap();

        let store = store.lock().unwrap();
        let scene = store.state().find_scene(&scene_id).unwrap();
        assert!(!scene.is_busy());
        assert_eq!(scene.image_url.as_deref(), Some("img-1"));
        assert_eq!(scene.progress, 100);
    }

    #[tokio::test]
    async fn test_batch_strategy_chunks_in_order() {
        let store = shared("script", GroupingStrategy::Batch(3));
        let workflow = AnalysisWorkflow::new(
            Arc::clone(&store),
            Arc::new(FixedAnalyzer {
                response: AnalysisResponse::Flat(flat(7)),
            }),
        );

        workflow.analyze().await.unwrap();

        let store = store.lock().unwrap();
        let groups = &store.state().scene_groups;
        let sizes: Vec<usize> = groups.iter().map(|g| g.scenes.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(groups[0].name, "Sequence 01");
        assert_eq!(groups[2].name, "Sequence 03");
        let numbers: Vec<i32> = groups
            .iter()
            .flat_map(|g| g.scenes.iter().map(|s| s.scene_number))
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_smart_strategy_keeps_names_and_defaults_blanks() {
        let store = shared("script", GroupingStrategy::Smart);
        let workflow = AnalysisWorkflow::new(
            Arc::clone(&store),
            Arc::new(FixedAnalyzer {
                response: AnalysisResponse::Grouped(vec![
                    AnalyzedGroup {
                        name: "The Heist".to_string(),
                        scenes: flat(2),
                    },
                    AnalyzedGroup {
                        name: "  ".to_string(),
                        scenes: flat(1),
                    },
                ]),
            }),
        );

        workflow.analyze().await.unwrap();

        let store = store.lock().unwrap();
        let groups = &store.state().scene_groups;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "The Heist");
        assert_eq!(groups[1].name, "Sequence 02");
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_an_analysis_failure() {
        let store = shared("script", GroupingStrategy::Smart);
        let workflow = AnalysisWorkflow::new(
            Arc::clone(&store),
            Arc::new(FixedAnalyzer {
                response: AnalysisResponse::Flat(flat(2)),
            }),
        );

        let err = workflow.analyze().await.unwrap_err();
        assert!(matches!(err, BoardError::AnalysisFailed(_)));
        // The malformed structure was not adopted.
        assert!(store.lock().unwrap().state().scene_groups.is_empty());
    }

    #[tokio::test]
    async fn test_empty_script_is_rejected_without_side_effects() {
        let store = shared("   \n", GroupingStrategy::Single);
        let workflow = AnalysisWorkflow::new(Arc::clone(&store), Arc::new(FailingAnalyzer));

        assert!(matches!(
            workflow.analyze().await,
            Err(BoardError::EmptyScript)
        ));
        assert!(store.lock().unwrap().history().is_empty());
    }

    #[tokio::test]
    async fn test_reanalysis_auto_snapshots_existing_board() {
        let store = shared("script", GroupingStrategy::Single);
        let workflow = AnalysisWorkflow::new(
            Arc::clone(&store),
            Arc::new(FixedAnalyzer {
                response: AnalysisResponse::Flat(flat(1)),
            }),
        );

        // First run: empty board, no auto-snapshot.
        workflow.analyze().await.unwrap();
        assert!(store.lock().unwrap().history().is_empty());

        // Second run: the existing board is captured first.
        workflow.analyze().await.unwrap();
        let store = store.lock().unwrap();
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].name, AUTO_SNAPSHOT_NAME);
        assert_eq!(store.history()[0].data.scene_groups[0].scenes.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_analysis_leaves_empty_recoverable_board() {
        let store = shared("script", GroupingStrategy::Single);
        // Seed the board so the auto-snapshot fires.
        {
            let seed = AnalysisWorkflow::new(
                Arc::clone(&store),
                Arc::new(FixedAnalyzer {
                    response: AnalysisResponse::Flat(flat(2)),
                }),
            );
            seed.analyze().await.unwrap();
        }

        let workflow = AnalysisWorkflow::new(Arc::clone(&store), Arc::new(FailingAnalyzer));
        let err = workflow.analyze().await.unwrap_err();
        assert!(matches!(err, BoardError::AnalysisFailed(_)));

        let mut store = store.lock().unwrap();
        assert_eq!(store.state().scene_count(), 0);

        // The auto-snapshot is the recovery mechanism.
        let snapshot_id = store.history()[0].id.clone();
        store.restore_snapshot(&snapshot_id, true).unwrap();
        assert_eq!(store.state().scene_count(), 2);
    }
}
