use std::{env, sync::Once};

use docnav::{
    config,
    pipeline::{DocumentPipeline, PipelineApi},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("LLM_PROVIDER", "ollama");
        set_default_env("LLM_BASE_URL", "http://127.0.0.1:11434");
        set_default_env("LLM_MODEL", "llama3.1");
        config::init_config().expect("live configuration");
    });
}

fn live_pipeline() -> DocumentPipeline {
    init_config_once();
    let config = config::get_config().expect("configuration loaded");
    DocumentPipeline::from_config(config).expect("model backend")
}

const MEMO: &str = "Memo to the harbour board. The dredging of berth four starts on 3 May \
and is expected to take six weeks. The budget is 1.2 million euros, funded by the port \
authority. The main risk is spring flooding, which could delay work by two weeks.";

#[tokio::test]
#[ignore = "Requires live Ollama runtime"]
async fn live_summary_is_shorter_than_source() {
    let pipeline = live_pipeline();
    let context = pipeline
        .summarize(MEMO)
        .await
        .expect("summary from live model");
    assert!(!context.summary.trim().is_empty());
    assert!(
        context.summary.len() < MEMO.len() * 2,
        "summary should stay concise: {:?}",
        context.summary
    );
}

#[tokio::test]
#[ignore = "Requires live Ollama runtime"]
async fn live_answer_is_grounded_in_summary() {
    let pipeline = live_pipeline();
    let context = pipeline
        .summarize(MEMO)
        .await
        .expect("summary from live model");
    let answer = pipeline
        .ask(&context.summary, "Which berth is being dredged?")
        .await
        .expect("answer from live model");
    assert!(
        answer.to_lowercase().contains("four") || answer.contains('4'),
        "answer should mention berth four: {answer:?}"
    );
}
