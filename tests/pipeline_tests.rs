//! End-to-end pipeline tests
//!
//! Each test stands up a mock recipe site, a temporary database and a
//! temporary checkpoint path, then drives the orchestrator through a run.

use recipe_harvest::checkpoint::{read_snapshot, CheckpointStore};
use recipe_harvest::config::{parse_config, Config};
use recipe_harvest::pipeline::{FailureKind, Orchestrator, RunRequest, TargetSource};
use recipe_harvest::storage::{open_storage, RecipeStore, SqliteRecipeStore};
use recipe_harvest::{CheckpointError, HarvestError, ThrottledClient};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    dir: TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: TempDir::new().unwrap(),
        }
    }

    fn url(&self, page: &str) -> String {
        format!("{}{}", self.server.uri(), page)
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("recipes.db")
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.dir.path().join("checkpoint.json")
    }

    /// Builds a config with `validation` as the body of its [validation] table
    fn config(&self, validation: &str, on_corrupt: &str) -> Config {
        let toml = format!(
            r#"
[site]
base-url = "{base}"
expected-domain = "127.0.0.1"

[fetch]
min-delay-ms = 0
max-attempts = 2
respect-robots = false
user-agents = ["TestHarvester/1.0"]

[validation]
{validation}

[checkpoint]
path = '{checkpoint}'
autosave-interval = 1
on-corrupt = "{on_corrupt}"

[output]
database-path = '{db}'

[run]
progress-interval = 1
"#,
            base = self.server.uri(),
            validation = validation,
            checkpoint = self.checkpoint_path().display(),
            on_corrupt = on_corrupt,
            db = self.db_path().display(),
        );
        parse_config(&toml).expect("test config is valid")
    }

    fn orchestrator(&self, config: &Config) -> Orchestrator<SqliteRecipeStore> {
        let client = ThrottledClient::new(&config.fetch, &config.site.base_url)
            .expect("client builds")
            .with_backoff_unit(Duration::from_millis(1));
        let store = open_storage(&self.db_path()).expect("database opens");
        Orchestrator::new(config, client, store).with_config_hash("test-hash")
    }

    async fn mount_recipe(&self, page: &str, name: &str, with_nutrition: bool) {
        let mut recipe = json!({
            "@context": "https://schema.org",
            "@type": "Recipe",
            "name": name,
            "description": "A weeknight favourite",
            "recipeYield": "4 servings",
            "totalTime": "PT45M",
            "recipeIngredient": ["2 cups flour", "1 tsp salt", "3 carrots, diced"],
            "recipeInstructions": [
                {"@type": "HowToStep", "text": "Mix the flour and salt."},
                {"@type": "HowToStep", "text": "Add the carrots and bake for 30 minutes."}
            ]
        });
        if with_nutrition {
            recipe["nutrition"] = json!({"@type": "NutritionInformation", "calories": "420 kcal"});
        }

        let html = format!(
            r#"<html><head><script type="application/ld+json">{}</script></head><body></body></html>"#,
            recipe
        );
        self.mount(page, ResponseTemplate::new(200).set_body_string(html), None)
            .await;
    }

    async fn mount(&self, page: &str, response: ResponseTemplate, expected: Option<u64>) {
        let mock = Mock::given(method("GET")).and(path(page)).respond_with(response);
        let mock = match expected {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    fn explicit(&self, pages: &[&str]) -> RunRequest {
        RunRequest {
            source: TargetSource::Explicit(pages.iter().map(|p| self.url(p)).collect()),
            resume: true,
            limit: None,
        }
    }
}

const STEW: &str = "/food/dinner/beef-stew";
const CAKE: &str = "/food/baking/lemon-cake";

fn count_recipes(db: &Path) -> u64 {
    open_storage(db).unwrap().count_recipes().unwrap()
}

#[tokio::test]
async fn test_second_run_skips_stored_recipes() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "Beef Stew", true).await;
    h.mount_recipe(CAKE, "Lemon Cake", true).await;
    let config = h.config("", "fail");

    let first = h.orchestrator(&config).run(h.explicit(&[STEW, CAKE])).await.unwrap();
    assert_eq!(first.success, 2);
    assert_eq!(first.failed, 0);
    assert!(!h.checkpoint_path().exists());

    let second = h.orchestrator(&config).run(h.explicit(&[STEW, CAKE])).await.unwrap();
    assert_eq!(second.success, 0);
    assert_eq!(second.skipped, 2);

    assert_eq!(count_recipes(&h.db_path()), 2);
    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let h = Harness::start().await;
    h.mount("/food/dinner/missing", ResponseTemplate::new(404), Some(1))
        .await;
    h.mount(
        "/food/dinner/empty",
        ResponseTemplate::new(200).set_body_string("<html><body><p>Nothing here</p></body></html>"),
        None,
    )
    .await;
    h.mount_recipe(STEW, "Beef Stew", true).await;
    let config = h.config("", "fail");

    let stats = h
        .orchestrator(&config)
        .run(h.explicit(&["/food/dinner/missing", "/food/dinner/empty", STEW]))
        .await
        .unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.failures_by_kind.get(&FailureKind::HttpStatus), Some(&1));
    assert_eq!(stats.failures_by_kind.get(&FailureKind::Extraction), Some(&1));
    assert!(!stats.interrupted);
    assert_eq!(count_recipes(&h.db_path()), 1);
}

#[tokio::test]
async fn test_resume_processes_only_pending_targets() {
    let h = Harness::start().await;
    h.mount(STEW, ResponseTemplate::new(200), Some(0)).await;
    h.mount_recipe(CAKE, "Lemon Cake", true).await;
    let config = h.config("", "fail");

    let mut saved = CheckpointStore::new(h.checkpoint_path(), 1);
    saved
        .create_session(vec![h.url(STEW), h.url(CAKE)], BTreeMap::new())
        .unwrap();
    saved.mark_success(&h.url(STEW)).unwrap();

    let stats = h.orchestrator(&config).run(h.explicit(&[STEW, CAKE])).await.unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.success, 1);
    assert!(!h.checkpoint_path().exists());
}

#[tokio::test]
async fn test_fresh_run_ignores_saved_checkpoint() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "Beef Stew", true).await;
    h.mount_recipe(CAKE, "Lemon Cake", true).await;
    let config = h.config("", "fail");

    let mut saved = CheckpointStore::new(h.checkpoint_path(), 1);
    saved.create_session(vec![h.url(CAKE)], BTreeMap::new()).unwrap();

    let mut request = h.explicit(&[STEW, CAKE]);
    request.resume = false;
    let stats = h.orchestrator(&config).run(request).await.unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 2);
}

#[tokio::test]
async fn test_corrupt_checkpoint_fails_by_default() {
    let h = Harness::start().await;
    h.mount(STEW, ResponseTemplate::new(200), Some(0)).await;
    std::fs::write(h.checkpoint_path(), "{ not json").unwrap();
    let config = h.config("", "fail");

    let result = h.orchestrator(&config).run(h.explicit(&[STEW])).await;

    assert!(matches!(
        result,
        Err(HarvestError::Checkpoint(CheckpointError::Corrupt { .. }))
    ));
    assert!(h.checkpoint_path().exists());
}

#[tokio::test]
async fn test_corrupt_checkpoint_discarded_when_configured() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "Beef Stew", true).await;
    std::fs::write(h.checkpoint_path(), "{ not json").unwrap();
    let config = h.config("", "discard");

    let stats = h.orchestrator(&config).run(h.explicit(&[STEW])).await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(count_recipes(&h.db_path()), 1);
}

#[tokio::test]
async fn test_strict_mode_rejects_records_with_warnings() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "Beef Stew", false).await;
    let config = h.config("strict = true", "fail");

    let stats = h.orchestrator(&config).run(h.explicit(&[STEW])).await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.validation_errors, 1);
    assert_eq!(stats.failures_by_kind.get(&FailureKind::Validation), Some(&1));
    assert_eq!(count_recipes(&h.db_path()), 0);
}

#[tokio::test]
async fn test_warnings_alone_do_not_block_storage() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "Beef Stew", false).await;
    let config = h.config("", "fail");

    let stats = h.orchestrator(&config).run(h.explicit(&[STEW])).await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.validation_errors, 0);
}

#[tokio::test]
async fn test_invalid_record_stored_when_continuing_on_error() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "AB", true).await;
    let config = h.config("continue-on-error = true", "fail");

    let stats = h.orchestrator(&config).run(h.explicit(&[STEW])).await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.validation_errors, 1);
    assert_eq!(count_recipes(&h.db_path()), 1);
}

#[tokio::test]
async fn test_invalid_record_rejected_without_continue_on_error() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "AB", true).await;
    let config = h.config("continue-on-error = false", "fail");

    let stats = h.orchestrator(&config).run(h.explicit(&[STEW])).await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failures_by_kind.get(&FailureKind::Validation), Some(&1));
    assert_eq!(count_recipes(&h.db_path()), 0);
}

#[tokio::test]
async fn test_limit_truncates_targets() {
    let h = Harness::start().await;
    h.mount_recipe(STEW, "Beef Stew", true).await;
    h.mount(CAKE, ResponseTemplate::new(200), Some(0)).await;
    let config = h.config("", "fail");

    let mut request = h.explicit(&[STEW, CAKE]);
    request.limit = Some(1);
    let stats = h.orchestrator(&config).run(request).await.unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.success, 1);
}

#[tokio::test]
async fn test_cancelled_run_keeps_checkpoint() {
    let h = Harness::start().await;
    h.mount(STEW, ResponseTemplate::new(200), Some(0)).await;
    h.mount(CAKE, ResponseTemplate::new(200), Some(0)).await;
    let config = h.config("", "fail");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let stats = h
        .orchestrator(&config)
        .with_cancellation(cancel)
        .run(h.explicit(&[STEW, CAKE]))
        .await
        .unwrap();

    assert!(stats.interrupted);
    assert_eq!(stats.processed(), 0);

    let session = read_snapshot(&h.checkpoint_path()).unwrap().unwrap();
    assert_eq!(session.pending().len(), 2);
    assert_eq!(session.total_count(), 2);
}

#[tokio::test]
async fn test_cancelled_discovery_reports_interrupted() {
    let h = Harness::start().await;
    h.mount("/sitemap.xml", ResponseTemplate::new(200), Some(0)).await;
    let mut config = h.config("", "fail");
    config.site.sitemap_url = Some(h.url("/sitemap.xml"));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let client = ThrottledClient::new(&config.fetch, &config.site.base_url)
        .unwrap()
        .with_cancellation(cancel.clone());
    let store = open_storage(&h.db_path()).unwrap();
    let mut orchestrator = Orchestrator::new(&config, client, store).with_cancellation(cancel);

    let stats = orchestrator
        .run(RunRequest {
            source: TargetSource::Discover {
                use_sitemap: true,
                use_categories: false,
            },
            resume: true,
            limit: None,
        })
        .await
        .unwrap();

    assert!(stats.interrupted);
    assert_eq!(stats.total, 0);
    assert!(!h.checkpoint_path().exists());
}
