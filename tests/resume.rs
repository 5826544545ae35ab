use poemscope::analysis::{PromptTemplate, RunConfig};
use poemscope::corpus::{CorpusConfig, CorpusLoader, LoadMode};
use poemscope::{ExportLoader, MockLLMClient, PoemAnalyzer, PoemKey, RunState, StandardizedAnalysis};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_corpus(root: &TempDir) -> CorpusConfig {
    let dir = root.path().join("data").join("TangPoems");
    fs::create_dir_all(&dir).unwrap();
    let poems = json!([
        {"title": "静夜思", "author": "李白", "paragraphs": ["床前明月光，疑是地上霜。", "举头望明月，低头思故乡。"]},
        {"title": "题都城南庄", "author": "崔护", "paragraphs": ["去年今日此门中，人面桃花相映红。", "人面不知何处去，桃花依旧笑春风。"]},
        {"title": "梅花", "author": "王安石", "paragraphs": ["墙角数枝梅，凌寒独自开。", "遥知不是雪，为有暗香来。"]}
    ]);
    fs::write(dir.join("poet.tang.0.json"), poems.to_string()).unwrap();
    CorpusConfig::default()
        .with_data_dir(root.path().join("data"))
        .with_databases(vec!["TangPoems".to_string()])
}

fn analyzer(mock: &MockLLMClient, root: &TempDir) -> PoemAnalyzer<MockLLMClient> {
    PoemAnalyzer::new(Arc::new(mock.clone()), PromptTemplate::default()).with_config(
        RunConfig::default()
            .with_output_dir(root.path().join("analysis_output"))
            .with_delay(Duration::ZERO),
    )
}

#[test]
fn resumed_run_skips_analyzed_poems_and_retries_failures() {
    let root = TempDir::new().unwrap();
    let corpus = write_corpus(&root);
    let output = root.path().join("analysis_output");

    let mock = MockLLMClient::default();
    mock.push_response(r#"{"date": 744, "flower": "none", "imagery": ["明月", "思乡"]}"#);
    mock.push_failure("timeout");
    let first_batch = CorpusLoader::new(corpus.clone()).load(LoadMode::Full, Some(2));
    let mut state = RunState::new();
    analyzer(&mock, &root)
        .run_batch(&first_batch, &mut state)
        .unwrap();

    let (_, document) = ExportLoader::latest(&output).unwrap().unwrap();
    assert_eq!(document.total_processed, 2);
    assert_eq!(document.total_analyzed, 1);
    assert!(document.results[1].error().is_some());
    assert_eq!(document.results[1].analysis(), &StandardizedAnalysis::default());

    let mut resumed = RunState::resume(document);
    let pending = resumed.filter_pending(CorpusLoader::new(corpus).load(LoadMode::Full, None));
    let keys: Vec<PoemKey> = pending.iter().map(|p| p.key()).collect();
    assert_eq!(
        keys,
        vec![PoemKey::new("题都城南庄", "崔护"), PoemKey::new("梅花", "王安石")]
    );

    let mock = MockLLMClient::default();
    mock.push_response("```json\n{\"date\": \"796\", \"flower\": \"桃\", \"imagery\": [\"春风\"]}\n```");
    mock.push_response("结果如下：{\"date\": 1076, \"flower\": \"梅\", \"imagery\": \"暗香\"} 谢谢");
    analyzer(&mock, &root)
        .run_batch(&pending, &mut resumed)
        .unwrap();

    assert_eq!(resumed.processed(), 4);
    assert_eq!(resumed.analyzed(), 3);
    let flowers: Vec<&str> = resumed
        .results()
        .iter()
        .map(|r| r.analysis().flower.as_str())
        .collect();
    assert_eq!(flowers, vec!["none", "桃花", "梅花"]);
    assert!(resumed.analyzed_keys().contains(&PoemKey::new("静夜思", "李白")));
}
