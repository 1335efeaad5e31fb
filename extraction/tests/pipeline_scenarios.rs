use std::sync::Arc;
use std::time::Duration;

use reel_recipe_extraction::prelude::*;
use reel_recipe_extraction::testing::{ScriptedBackend, StaticFetcher};
use reel_recipe_extraction::{Amount, ExtractionMetrics};
use serde_json::json;

const URL: &str = "https://www.tiktok.com/@khanhong/video/7557275818255273234";

fn noodles(title: &str) -> String {
    json!({
        "recipe_overview": {
            "title": title,
            "servings": 2,
            "prep_time": "10 minutes",
            "difficulty": "Easy",
            "cuisine_type": "Asian"
        },
        "ingredients": [
            {"item": "noodles", "amount": 200, "unit": "g"},
            {"item": "garlic", "amount": "3-4", "unit": "cloves", "notes": "minced"},
            {"item": "soy sauce", "amount": "2", "unit": "tbsp"}
        ],
        "instructions": [
            "Boil the noodles.",
            "Fry the garlic.",
            "Toss everything together."
        ],
        "equipment": ["wok"]
    })
    .to_string()
}

fn pipeline(backend: &Arc<ScriptedBackend>) -> (ExtractionPipeline, Arc<StaticFetcher>) {
    let fetcher = Arc::new(StaticFetcher::with_caption(
        "Spicy garlic noodles in 15 minutes #recipe",
    ));
    let config = ExtractionConfig::default()
        .with_backoff(Duration::from_millis(1), Duration::from_millis(5));
    let pipeline = ExtractionPipeline::new(config, fetcher.clone(), backend.clone());
    (pipeline, fetcher)
}

#[tokio::test]
async fn first_attempt_success() {
    let backend = Arc::new(ScriptedBackend::replying([noodles("Spicy Garlic Noodles")]));
    let (pipeline, fetcher) = pipeline(&backend);

    let result = pipeline.extract(URL, 2).await;

    assert!(result.success);
    assert!(result.metadata.is_valid);
    assert_eq!(result.metadata.errors, None);
    assert_eq!(backend.calls(), 1);
    assert_eq!(fetcher.calls(), 1);

    let recipe = result.recipe.unwrap();
    assert_eq!(result.metadata.steps, recipe.instructions.len());
    assert_eq!(recipe.overview.title, "Spicy Garlic Noodles");
    assert_eq!(recipe.ingredients[2].unit.as_deref(), Some("ml"));
    assert_eq!(recipe.ingredients[2].amount, Amount::Text("29.58".to_string()));
    assert!(result.processing_time >= 0.0);
}

#[tokio::test]
async fn missing_title_repaired_on_second_attempt() {
    let backend = Arc::new(ScriptedBackend::replying([noodles(""), noodles("Garlic Noodles")]));
    let (pipeline, _) = pipeline(&backend);

    let result = pipeline.extract(URL, 2).await;

    assert!(result.success);
    assert_eq!(backend.calls(), 2);
    assert_eq!(result.recipe.unwrap().overview.title, "Garlic Noodles");
    assert!(backend.prompts()[1].contains("recipe_overview.title: must not be empty"));
}

#[tokio::test]
async fn null_servings_and_equipment_succeed_first_try() {
    let reply = json!({
        "recipe_overview": {"title": "Toast", "servings": null},
        "ingredients": [{"item": "bread", "amount": 2, "unit": null}],
        "instructions": ["Toast the bread."],
        "equipment": null
    })
    .to_string();
    let backend = Arc::new(ScriptedBackend::replying([reply]));
    let (pipeline, _) = pipeline(&backend);

    let result = pipeline.extract(URL, 2).await;

    assert!(result.success, "{:?}", result.metadata.errors);
    assert_eq!(backend.calls(), 1);
    let recipe = result.recipe.unwrap();
    assert_eq!(recipe.overview.servings, 4);
    assert!(recipe.equipment.is_empty());
}

#[tokio::test]
async fn transport_failure_on_every_attempt() {
    let backend = Arc::new(ScriptedBackend::new([
        Err(BackendError::Transport("connection refused".to_string())),
        Err(BackendError::Transport("connection refused".to_string())),
    ]));
    let (pipeline, _) = pipeline(&backend);

    let result = pipeline.extract(URL, 1).await;

    assert!(!result.success);
    assert!(result.recipe.is_none());
    assert_eq!(backend.calls(), 2);
    assert_eq!(result.metadata.steps, 0);
    let errors = result.metadata.errors.unwrap();
    assert!(errors.iter().any(|e| e.contains("transport")), "{errors:?}");
}

#[tokio::test]
async fn imperial_butter_becomes_millilitres() {
    let draft = json!({
        "recipe_overview": {"title": "Brown Butter Cookies"},
        "ingredients": [{"item": "butter", "amount": "1", "unit": "cup"}],
        "instructions": ["Brown the butter at 350°F."]
    });
    let backend = Arc::new(ScriptedBackend::replying([draft.to_string()]));
    let (pipeline, _) = pipeline(&backend);

    let recipe = pipeline.extract(URL, 0).await.recipe.unwrap();
    let butter = &recipe.ingredients[0];

    assert_eq!(butter.item, "butter");
    assert_eq!(butter.unit.as_deref(), Some("ml"));
    assert_eq!(butter.amount, Amount::Text("236.59".to_string()));
    assert_eq!(butter.notes, None);
    assert_eq!(recipe.instructions[0], "Brown the butter at 175°C.");
}

#[tokio::test]
async fn zero_retries_means_one_call() {
    let backend = Arc::new(ScriptedBackend::replying(["Sorry, no recipe here."]));
    let (pipeline, _) = pipeline(&backend);

    let result = pipeline.extract(URL, 0).await;

    assert!(!result.success);
    assert_eq!(backend.calls(), 1);
    assert!(result.metadata.errors.unwrap()[0].contains("could not parse"));
}

#[tokio::test]
async fn fetch_failure_skips_llm() {
    let backend = Arc::new(ScriptedBackend::replying([noodles("Never used")]));
    let fetcher = Arc::new(StaticFetcher::failing(FetchError::Unreachable(
        "HTTP Error 404".to_string(),
    )));
    let pipeline = ExtractionPipeline::new(ExtractionConfig::default(), fetcher, backend.clone());

    let result = pipeline.extract(URL, 2).await;

    assert!(!result.success);
    assert!(result.recipe.is_none());
    assert_eq!(backend.calls(), 0);
    let errors = result.metadata.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("could not fetch video content"));
    assert!(result.processing_time >= 0.0);
}

#[tokio::test]
async fn calls_never_exceed_retry_budget() {
    for max_retries in 0..4 {
        let backend = Arc::new(ScriptedBackend::replying(
            std::iter::repeat_n(noodles(""), 10),
        ));
        let (pipeline, _) = pipeline(&backend);

        let result = pipeline.extract(URL, max_retries).await;

        assert!(!result.success);
        assert_eq!(backend.calls(), max_retries + 1);
        assert_eq!(result.metadata.steps, 3);
        assert_eq!(
            result.metadata.errors.unwrap(),
            vec!["recipe_overview.title: must not be empty"]
        );
    }
}

#[tokio::test]
async fn typed_result_carries_metrics() {
    let backend = Arc::new(ScriptedBackend::new([
        Err(BackendError::RateLimited { retry_after: None }),
        Ok(noodles("Garlic Noodles")),
    ]));
    let (pipeline, _) = pipeline(&backend);

    let extracted = pipeline.try_extract(URL, 2).await.unwrap();
    let ExtractionMetrics {
        total_attempts,
        rate_limit_wait,
        estimated_input_tokens,
        estimated_output_tokens,
        ..
    } = extracted.metrics;

    assert_eq!(total_attempts, 2);
    assert_eq!(rate_limit_wait, Duration::from_millis(1));
    assert!(estimated_input_tokens > 0);
    assert!(estimated_output_tokens > 0);
}

#[tokio::test]
async fn handle_uses_default_retries() {
    let backend = Arc::new(ScriptedBackend::default());
    let (pipeline, _) = pipeline(&backend);

    let result = pipeline
        .handle(ExtractionRequest {
            video_url: URL.to_string(),
            max_retries: None,
        })
        .await;

    assert!(!result.success);
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn concurrent_extractions_are_independent() {
    let backend = Arc::new(ScriptedBackend::replying(
        std::iter::repeat_n(noodles("Garlic Noodles"), 8),
    ));
    let (pipeline, _) = pipeline(&backend);
    let pipeline = Arc::new(pipeline);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move { pipeline.extract(URL, 0).await });
    }

    let mut successes = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap().success {
            successes += 1;
        }
    }
    assert_eq!(successes, 8);
    assert_eq!(backend.calls(), 8);
}
