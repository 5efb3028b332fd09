use content_assessor::checks::Check;
use content_assessor::config::{AnalysisConfig, ConfigPatch};
use content_assessor::error::{AnalysisError, ErrorKind, Result};
use content_assessor::logger;
use content_assessor::models::{AssessmentResult, Lane, OverallScore, Paper};
use content_assessor::orchestrator::{Assessor, Pluggable};
use content_assessor::research::Researcher;
use content_assessor::worker::{AnalysisWorker, WorkerClient, WorkerRequest, WorkerResponse};
use content_assessor::DefaultTranslator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

struct AlwaysBad;

impl Check for AlwaysBad {
    fn identifier(&self) -> &str {
        "custom/always-bad"
    }

    fn is_applicable(&self, _: &Paper) -> bool {
        true
    }

    fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
        Ok(AssessmentResult::new("custom/always-bad")
            .with_score(0.0)
            .with_text("This always fails."))
    }
}

fn pluggable_with_always_bad(lane: Lane) -> Pluggable {
    let mut pluggable = Pluggable::new();
    pluggable.register_plugin("custom").unwrap();
    pluggable.register_check("custom", lane, Arc::new(AlwaysBad)).unwrap();
    pluggable.plugin_ready("custom").unwrap();
    pluggable
}

async fn client(pluggable: Pluggable) -> WorkerClient {
    logger::init();
    let client = WorkerClient::spawn(AnalysisWorker::new(pluggable));
    assert_ok!(client.initialize(AnalysisConfig::default()).await);
    client
}

#[test]
fn test_empty_text_gives_no_content_sentinel() {
    let paper = Paper::builder("").keyphrase("cats").build();
    for lane in Lane::ALL {
        let mut assessor = Assessor::for_lane(
            lane,
            &AnalysisConfig::default(),
            &Pluggable::new(),
            Arc::new(DefaultTranslator::new()),
        )
        .unwrap();
        let result_set = assessor.run(&paper, &mut Researcher::with_default_researches());
        assert!(result_set.is_empty());
        assert_eq!(result_set.overall, OverallScore::NoContent);
    }
}

#[test]
fn test_shared_computation_runs_once_per_paper() {
    struct CountingCheck(&'static str);

    impl Check for CountingCheck {
        fn identifier(&self) -> &str {
            self.0
        }
        fn is_applicable(&self, paper: &Paper) -> bool {
            paper.has_text()
        }
        fn execute(&self, _: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
            let tokens: usize = researcher.get_as("tokens")?;
            Ok(AssessmentResult::new(self.0).with_score(tokens as f64))
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut researcher = Researcher::new();
    researcher.register("tokens", move |paper: &Paper, _: &Researcher| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!(paper.text().split_whitespace().count()))
    });

    let mut assessor = Assessor::new();
    for id in ["a", "b", "c"] {
        assessor.register_check(Arc::new(CountingCheck(id)));
    }

    let first = Paper::new("one two three");
    assessor.run(&first, &mut researcher);
    assessor.run(&first, &mut researcher);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assessor.run(&Paper::new("four five"), &mut researcher);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_list_presence_scenario() {
    let client = client(Pluggable::new()).await;
    let paper = Paper::builder("<ul><li>a</li></ul> dogs").keyphrase("dogs").build();

    let result_set = client.analyze(Lane::Readability, paper).await.unwrap().unwrap();
    let list = result_set.get("readability/list-presence").unwrap();
    assert_eq!(list.score, Some(9.0));
    assert!(!list.has_marks);
    client.shutdown().await;
}

#[tokio::test]
async fn test_always_bad_check_comes_first() {
    let client = client(pluggable_with_always_bad(Lane::Seo)).await;
    let paper = Paper::builder("Cats are lovely animals. Many people keep cats.")
        .keyphrase("cats")
        .build();

    let result_set = client.analyze(Lane::Seo, paper).await.unwrap().unwrap();
    assert_eq!(result_set.results[0].identifier, "custom/always-bad");
    assert_eq!(result_set.results[0].score, Some(0.0));
    client.shutdown().await;
}

#[tokio::test]
async fn test_panicking_applicability_keeps_other_checks() {
    struct Moody;

    impl Check for Moody {
        fn identifier(&self) -> &str {
            "custom/moody"
        }
        fn is_applicable(&self, _: &Paper) -> bool {
            panic!("applicability boom")
        }
        fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
            Ok(AssessmentResult::new("custom/moody").with_score(9.0))
        }
    }

    let mut pluggable = Pluggable::new();
    pluggable.register_plugin("custom").unwrap();
    pluggable.register_check("custom", Lane::Seo, Arc::new(Moody)).unwrap();
    pluggable.plugin_ready("custom").unwrap();
    let client = client(pluggable).await;

    let paper = Paper::builder("Cats are lovely animals. Many people keep cats.")
        .keyphrase("cats")
        .build();
    let result_set = assert_ok!(client.analyze(Lane::Seo, paper).await).unwrap();
    assert!(result_set.get("seo/text-length").is_some());
    assert!(result_set.get("custom/moody").is_none());
    assert_eq!(result_set.diagnostics.len(), 1);
    assert_eq!(result_set.diagnostics[0].identifier, "custom/moody");
    assert_eq!(result_set.diagnostics[0].message, "applicability boom");
    client.shutdown().await;
}

#[tokio::test]
async fn test_only_latest_request_in_lane_is_delivered() {
    let client = client(Pluggable::new()).await;
    let r1 = client.submit(Lane::Seo, Paper::new("unit a")).await.unwrap();
    let r2 = client.submit(Lane::Seo, Paper::new("unit b")).await.unwrap();

    assert_eq!(r1.wait().await.unwrap(), None);
    let delivered = r2.wait().await.unwrap();
    assert!(delivered.is_some());
    client.shutdown().await;
}

#[tokio::test]
async fn test_raw_channel_supersession() {
    let mut channel = AnalysisWorker::new(Pluggable::new()).spawn();
    channel
        .requests
        .send(WorkerRequest::Initialize {
            configuration: AnalysisConfig::default(),
        })
        .unwrap();
    for (request_id, text) in [(1, "unit a"), (2, "unit b")] {
        channel
            .requests
            .send(WorkerRequest::Analyze {
                request_id,
                lane: Lane::Seo,
                paper: Paper::new(text),
            })
            .unwrap();
    }
    drop(channel.requests);

    let mut responses = Vec::new();
    while let Some(response) = channel.responses.recv().await {
        responses.push(response);
    }
    assert_eq!(responses[0], WorkerResponse::Ready);
    let ids: Vec<Option<u64>> = responses[1..].iter().map(|r| r.request_id()).collect();
    assert_eq!(ids, vec![Some(2)]);
}

#[tokio::test]
async fn test_json_transport() {
    let mut channel = AnalysisWorker::new(Pluggable::new()).spawn();
    let messages = [
        r#"{"type":"initialize","configuration":{"use_cornerstone":true}}"#,
        r#"{"type":"analyze","request_id":1,"lane":"seo","paper":{"text":"Short text.","keyphrase":"text"}}"#,
    ];
    for raw in messages {
        channel.requests.send(WorkerRequest::from_json(raw).unwrap()).unwrap();
    }

    assert_eq!(channel.responses.recv().await, Some(WorkerResponse::Ready));
    let response = channel.responses.recv().await.unwrap();
    let raw = response.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["type"], "result");
    assert_eq!(value["request_id"], 1);
    assert!(value["result_set"]["results"].is_array());

    assert_err!(WorkerRequest::from_json(r#"{"type":"analyze"}"#));
}

#[tokio::test]
async fn test_update_configuration_applies_to_later_requests() {
    let client = client(Pluggable::new()).await;
    let paper = Paper::new(&"word ".repeat(400));

    let before = client.analyze(Lane::Seo, paper.clone()).await.unwrap().unwrap();
    assert_eq!(before.get("seo/text-length").and_then(|r| r.score), Some(9.0));

    client
        .update_configuration(ConfigPatch {
            use_cornerstone: Some(true),
            ..Default::default()
        })
        .unwrap();
    let after = client.analyze(Lane::Seo, paper).await.unwrap().unwrap();
    assert!(after.get("seo/text-length").and_then(|r| r.score).unwrap() < 9.0);
    client.shutdown().await;
}

#[tokio::test]
async fn test_unknown_research_surfaces_error_kind() {
    let client = client(Pluggable::new()).await;
    let err = client.run_research("syllables", Paper::new("text")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownComputation);

    let words = client.run_research("word_count", Paper::new("a b c d")).await.unwrap();
    assert_eq!(words, serde_json::json!(4));
    client.shutdown().await;
}

#[tokio::test]
async fn test_cancel_resolves_ticket_without_result() {
    let client = client(Pluggable::new()).await;
    let ticket = client.submit(Lane::Readability, Paper::new("Some text.")).await.unwrap();
    client.cancel(ticket.request_id).await.unwrap();
    assert_eq!(ticket.wait().await.unwrap(), None);

    // worker 继续服务后续请求
    let next = client.analyze(Lane::Readability, Paper::new("More text.")).await.unwrap();
    assert!(next.is_some());
    client.shutdown().await;
}

#[test]
fn test_invalid_content_rejected() {
    let err = Paper::from_json(serde_json::json!({ "text": ["not", "a", "string"] })).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidContent { .. }));
}
